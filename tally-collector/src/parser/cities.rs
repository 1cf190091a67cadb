//! Regional-cities document: per-party tallies for the regional capitals.
//!
//! Cities are municipalities parented to their region; the parent is
//! created as a placeholder if it has not been published yet.

use roxmltree::Node;

use tally_common::db::models::RegionKind;

use super::{
    attr_decimal, attr_i64, attr_str, elements, expect_root, req_attr, FactSet, ParseError,
    RegionFact, ResultFact,
};

pub(super) fn parse(root: Node) -> Result<FactSet, ParseError> {
    expect_root(root, "CITIES")?;

    let mut facts = FactSet::default();
    for city in elements(root, "CITY") {
        let code = req_attr(city, "code")?.to_string();
        facts.regions.push(RegionFact {
            code: code.clone(),
            name: attr_str(city, "name"),
            kind: RegionKind::Municipality,
            parent_code: city.attribute("region").map(str::to_string),
        });
        for party in elements(city, "PARTY") {
            facts.results.push(ResultFact {
                region_code: code.clone(),
                party_code: req_attr(party, "code")?.to_string(),
                votes: attr_i64(party, "votes")?,
                percentage: attr_decimal(party, "pct")?,
                mandates: 0,
            });
        }
    }

    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use tally_common::db::models::SnapshotKind;

    #[test]
    fn cities_are_municipalities_under_their_region() {
        let facts = parse(
            r#"
            <CITIES>
                <CITY code="M554782" name="North Capital" region="R03">
                    <PARTY code="P01" votes="54000" pct="27,5"/>
                </CITY>
            </CITIES>
            "#,
            SnapshotKind::RegionalCities,
            None,
        )
        .expect("parses");

        assert_eq!(facts.regions.len(), 1);
        assert_eq!(facts.regions[0].code, "M554782");
        assert_eq!(facts.regions[0].parent_code.as_deref(), Some("R03"));
        assert_eq!(facts.results.len(), 1);
        assert_eq!(facts.results[0].votes, 54000);
    }
}
