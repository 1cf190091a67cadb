//! Per-district results document
//!
//! Carries the district's own progress and party tallies plus a nested
//! per-municipality breakdown (votes only at that level).

use roxmltree::Node;

use tally_common::db::models::RegionKind;

use super::{
    attr_decimal, attr_i64, attr_str, elements, expect_root, progress_fact, req_attr, FactSet,
    ParseError, RegionFact, ResultFact,
};

pub(super) fn parse(root: Node, source_id: Option<&str>) -> Result<FactSet, ParseError> {
    expect_root(root, "DISTRICT")?;

    // The document names its own district; the fetch path's code is the
    // fallback for exports that omit the attribute.
    let code = root
        .attribute("code")
        .or(source_id)
        .ok_or(ParseError::MissingAttribute("code"))?
        .to_string();

    let mut facts = FactSet::default();
    facts.regions.push(RegionFact {
        code: code.clone(),
        name: attr_str(root, "name"),
        kind: RegionKind::District,
        parent_code: None,
    });

    if let Some(progress) = elements(root, "PROGRESS").next() {
        facts.progress.push(progress_fact(progress, &code)?);
    }

    for party in elements(root, "PARTY") {
        facts.results.push(ResultFact {
            region_code: code.clone(),
            party_code: req_attr(party, "code")?.to_string(),
            votes: attr_i64(party, "votes")?,
            percentage: attr_decimal(party, "pct")?,
            mandates: 0,
        });
    }

    for municipality in elements(root, "MUNICIPALITY") {
        let muni_code = req_attr(municipality, "code")?.to_string();
        facts.regions.push(RegionFact {
            code: muni_code.clone(),
            name: attr_str(municipality, "name"),
            kind: RegionKind::Municipality,
            parent_code: Some(code.clone()),
        });
        for party in elements(municipality, "PARTY") {
            facts.results.push(ResultFact {
                region_code: muni_code.clone(),
                party_code: req_attr(party, "code")?.to_string(),
                votes: attr_i64(party, "votes")?,
                percentage: 0.0,
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

    const DOCUMENT: &str = r#"
        <DISTRICT code="D0100" name="Capital District">
            <PROGRESS precincts_counted="120" precincts_total="300"
                      counted_pct="40,0" turnout_pct="58,2"/>
            <PARTY code="P01" votes="42000" pct="24,80"/>
            <MUNICIPALITY code="M500054" name="Riverside" counted="1">
                <PARTY code="P01" votes="1800"/>
            </MUNICIPALITY>
        </DISTRICT>
    "#;

    #[test]
    fn district_and_municipalities_are_extracted() {
        let facts = parse(DOCUMENT, SnapshotKind::District, Some("D0100")).expect("parses");

        assert_eq!(facts.regions.len(), 2);
        assert_eq!(facts.regions[0].code, "D0100");
        assert_eq!(facts.regions[1].code, "M500054");
        assert_eq!(facts.regions[1].parent_code.as_deref(), Some("D0100"));

        assert_eq!(facts.results.len(), 2);
        assert_eq!(facts.results[0].region_code, "D0100");
        assert_eq!(facts.results[1].region_code, "M500054");
        assert_eq!(facts.results[1].votes, 1800);

        assert_eq!(facts.progress.len(), 1);
        assert_eq!(facts.progress[0].counted_precincts, 120);
    }

    #[test]
    fn fetch_path_code_is_the_fallback() {
        let facts = parse("<DISTRICT/>", SnapshotKind::District, Some("D0201")).expect("parses");
        assert_eq!(facts.regions[0].code, "D0201");
        assert_eq!(facts.regions[0].name, "");
    }

    #[test]
    fn missing_code_everywhere_is_an_error() {
        assert!(parse("<DISTRICT/>", SnapshotKind::District, None).is_err());
    }
}
