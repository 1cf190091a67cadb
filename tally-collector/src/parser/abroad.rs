//! Abroad-votes document
//!
//! Overall tallies for votes cast abroad plus a per-foreign-country
//! breakdown. Both hang off the synthetic abroad region.

use roxmltree::Node;

use tally_common::db::models::RegionKind;

use super::{
    attr_decimal, attr_i64, attr_str, elements, expect_root, req_attr, FactSet, ParseError,
    ProgressFact, RegionFact, ResultFact, ABROAD_CODE, ABROAD_NAME,
};

pub(super) fn parse(root: Node) -> Result<FactSet, ParseError> {
    expect_root(root, "ABROAD")?;

    let mut facts = FactSet::default();
    facts.regions.push(RegionFact {
        code: ABROAD_CODE.to_string(),
        name: ABROAD_NAME.to_string(),
        kind: RegionKind::Abroad,
        parent_code: None,
    });

    if root.attribute("valid_votes").is_some() {
        facts.progress.push(ProgressFact {
            region_code: ABROAD_CODE.to_string(),
            valid_votes: attr_i64(root, "valid_votes")?,
            ..ProgressFact::default()
        });
    }

    for party in elements(root, "PARTY") {
        facts.results.push(ResultFact {
            region_code: ABROAD_CODE.to_string(),
            party_code: req_attr(party, "code")?.to_string(),
            votes: attr_i64(party, "votes")?,
            percentage: attr_decimal(party, "pct")?,
            mandates: 0,
        });
    }

    for country in elements(root, "COUNTRY") {
        let code = req_attr(country, "code")?.to_string();
        facts.regions.push(RegionFact {
            code: code.clone(),
            name: attr_str(country, "name"),
            kind: RegionKind::ForeignCountry,
            parent_code: Some(ABROAD_CODE.to_string()),
        });
        for party in elements(country, "PARTY") {
            facts.results.push(ResultFact {
                region_code: code.clone(),
                party_code: req_attr(party, "code")?.to_string(),
                votes: attr_i64(party, "votes")?,
                percentage: 0.0,
                mandates: 0,
            });
        }
    }

    Ok(facts)
}
