//! Incremental batch documents (precinct, municipality, district families)
//!
//! Every batch kind is a flat list of homogeneous items; the list walk is
//! shared and only the per-item field mapping differs.
//!
//! Precinct items are validated but project nothing: the entity model
//! tracks nothing below municipality granularity, and per-precinct tallies
//! are partial by construction. The documents stay in the raw log.

use roxmltree::Node;

use tally_common::db::models::RegionKind;

use super::{
    attr_decimal, attr_i64, attr_str, elements, expect_root, req_attr, FactSet, ParseError,
    ProgressFact, RegionFact, ResultFact,
};

pub(super) fn parse_precincts(root: Node) -> Result<FactSet, ParseError> {
    walk(root, "PRECINCT_BATCH", "PRECINCT", map_precinct)
}

pub(super) fn parse_municipalities(root: Node) -> Result<FactSet, ParseError> {
    walk(root, "MUNICIPALITY_BATCH", "MUNICIPALITY", map_municipality)
}

pub(super) fn parse_districts(root: Node) -> Result<FactSet, ParseError> {
    walk(root, "DISTRICT_BATCH", "DISTRICT", map_district)
}

type ItemMapper = fn(Node, &mut FactSet) -> Result<(), ParseError>;

fn walk(
    root: Node,
    root_name: &'static str,
    item_name: &'static str,
    map_item: ItemMapper,
) -> Result<FactSet, ParseError> {
    expect_root(root, root_name)?;

    let mut facts = FactSet::default();
    for item in elements(root, item_name) {
        map_item(item, &mut facts)?;
    }
    Ok(facts)
}

fn map_precinct(item: Node, _facts: &mut FactSet) -> Result<(), ParseError> {
    req_attr(item, "code")?;
    for party in elements(item, "PARTY") {
        req_attr(party, "code")?;
        attr_i64(party, "votes")?;
    }
    Ok(())
}

fn map_municipality(item: Node, facts: &mut FactSet) -> Result<(), ParseError> {
    let code = req_attr(item, "code")?.to_string();
    facts.regions.push(RegionFact {
        code: code.clone(),
        name: attr_str(item, "name"),
        kind: RegionKind::Municipality,
        parent_code: item.attribute("district").map(str::to_string),
    });
    for party in elements(item, "PARTY") {
        facts.results.push(ResultFact {
            region_code: code.clone(),
            party_code: req_attr(party, "code")?.to_string(),
            votes: attr_i64(party, "votes")?,
            percentage: attr_decimal(party, "pct")?,
            mandates: 0,
        });
    }
    Ok(())
}

fn map_district(item: Node, facts: &mut FactSet) -> Result<(), ParseError> {
    let code = req_attr(item, "code")?.to_string();
    facts.regions.push(RegionFact {
        code: code.clone(),
        name: attr_str(item, "name"),
        kind: RegionKind::District,
        parent_code: item.attribute("region").map(str::to_string),
    });

    let counted = attr_i64(item, "precincts_counted")?;
    let total = attr_i64(item, "precincts_total")?;
    facts.progress.push(ProgressFact {
        region_code: code.clone(),
        counted_precincts: counted,
        total_precincts: total,
        counted_percentage: if total > 0 {
            counted as f64 * 100.0 / total as f64
        } else {
            0.0
        },
        turnout_percentage: attr_decimal(item, "turnout_pct")?,
        ..ProgressFact::default()
    });

    for party in elements(item, "PARTY") {
        facts.results.push(ResultFact {
            region_code: code.clone(),
            party_code: req_attr(party, "code")?.to_string(),
            votes: attr_i64(party, "votes")?,
            percentage: attr_decimal(party, "pct")?,
            mandates: 0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use tally_common::db::models::SnapshotKind;

    #[test]
    fn precinct_batches_validate_but_project_nothing() {
        let facts = parse(
            r#"
            <PRECINCT_BATCH>
                <PRECINCT code="41002" municipality="M500054" counted="1">
                    <PARTY code="P01" votes="312"/>
                </PRECINCT>
            </PRECINCT_BATCH>
            "#,
            SnapshotKind::PrecinctBatch,
            Some("00001"),
        )
        .expect("parses");
        assert!(facts.is_empty());
    }

    #[test]
    fn malformed_precinct_votes_still_fail_the_document() {
        let err = parse(
            r#"<PRECINCT_BATCH><PRECINCT code="1"><PARTY code="P01" votes="x"/></PRECINCT></PRECINCT_BATCH>"#,
            SnapshotKind::PrecinctBatch,
            None,
        )
        .expect_err("bad number");
        assert!(matches!(
            err,
            super::ParseError::InvalidNumber { attr: "votes", .. }
        ));
    }

    #[test]
    fn municipality_items_become_regions_and_results() {
        let facts = parse(
            r#"
            <MUNICIPALITY_BATCH>
                <MUNICIPALITY code="M500113" name="Hillford" district="D0204"
                              counted="1" turnout_pct="61,8">
                    <PARTY code="P01" votes="940" pct="31,2"/>
                    <PARTY code="P02" votes="611" pct="20,3"/>
                </MUNICIPALITY>
            </MUNICIPALITY_BATCH>
            "#,
            SnapshotKind::MunicipalityBatch,
            Some("00002"),
        )
        .expect("parses");

        assert_eq!(facts.regions.len(), 1);
        assert_eq!(facts.regions[0].parent_code.as_deref(), Some("D0204"));
        assert_eq!(facts.results.len(), 2);
        assert_eq!(facts.results[0].votes, 940);
    }

    #[test]
    fn district_items_carry_progress_counters() {
        let facts = parse(
            r#"
            <DISTRICT_BATCH>
                <DISTRICT code="D0204" name="Eastern District" region="R02"
                          precincts_counted="75" precincts_total="300"
                          turnout_pct="59,4">
                    <PARTY code="P01" votes="15200" pct="28,9"/>
                </DISTRICT>
            </DISTRICT_BATCH>
            "#,
            SnapshotKind::DistrictBatch,
            Some("00003"),
        )
        .expect("parses");

        assert_eq!(facts.regions.len(), 1);
        assert_eq!(facts.regions[0].kind.as_str(), "district");
        assert_eq!(facts.progress.len(), 1);
        assert_eq!(facts.progress[0].counted_precincts, 75);
        assert!((facts.progress[0].counted_percentage - 25.0).abs() < 1e-9);
        assert_eq!(facts.results.len(), 1);
    }
}
