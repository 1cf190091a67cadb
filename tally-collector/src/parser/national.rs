//! National results document
//!
//! The only document kind that carries full party identities (name and
//! ballot number). Contains the nationwide progress counters, nationwide
//! per-party tallies, and a per-region breakdown.

use roxmltree::Node;

use tally_common::db::models::RegionKind;

use super::{
    attr_decimal, attr_i64, attr_str, elements, expect_root, progress_fact, req_attr, FactSet,
    ParseError, PartyFact, RegionFact, ResultFact, NATION_CODE, NATION_NAME,
};

pub(super) fn parse(root: Node) -> Result<FactSet, ParseError> {
    expect_root(root, "RESULTS")?;

    let mut facts = FactSet::default();
    facts.regions.push(RegionFact {
        code: NATION_CODE.to_string(),
        name: NATION_NAME.to_string(),
        kind: RegionKind::Country,
        parent_code: None,
    });

    if let Some(progress) = elements(root, "PROGRESS").next() {
        facts.progress.push(progress_fact(progress, NATION_CODE)?);
    }

    for party in elements(root, "PARTY") {
        let code = req_attr(party, "code")?.to_string();
        facts.parties.push(PartyFact {
            code: code.clone(),
            name: attr_str(party, "name"),
            ballot_number: attr_i64(party, "ballot_no")?,
        });
        facts.results.push(ResultFact {
            region_code: NATION_CODE.to_string(),
            party_code: code,
            votes: attr_i64(party, "votes")?,
            percentage: attr_decimal(party, "pct")?,
            mandates: attr_i64(party, "mandates")?,
        });
    }

    for region in elements(root, "REGION") {
        let region_code = req_attr(region, "code")?.to_string();
        facts.regions.push(RegionFact {
            code: region_code.clone(),
            name: attr_str(region, "name"),
            kind: RegionKind::Region,
            parent_code: Some(NATION_CODE.to_string()),
        });
        for party in elements(region, "PARTY") {
            facts.results.push(ResultFact {
                region_code: region_code.clone(),
                party_code: req_attr(party, "code")?.to_string(),
                votes: attr_i64(party, "votes")?,
                percentage: attr_decimal(party, "pct")?,
                mandates: 0,
            });
        }
    }

    Ok(facts)
}
