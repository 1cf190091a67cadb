//! Candidate preferential-votes document

use roxmltree::Node;

use super::{
    attr_decimal, attr_flag, attr_i64, attr_str, elements, expect_root, req_attr, CandidateFact,
    FactSet, ParseError,
};

pub(super) fn parse(root: Node) -> Result<FactSet, ParseError> {
    expect_root(root, "CANDIDATES")?;

    let mut facts = FactSet::default();
    for candidate in elements(root, "CANDIDATE") {
        facts.candidates.push(CandidateFact {
            party_code: req_attr(candidate, "party")?.to_string(),
            region_code: req_attr(candidate, "region")?.to_string(),
            given_name: attr_str(candidate, "given_name"),
            surname: attr_str(candidate, "surname"),
            title_before: attr_str(candidate, "title_before"),
            title_after: attr_str(candidate, "title_after"),
            list_position: attr_i64(candidate, "position")?,
            preferential_votes: attr_i64(candidate, "pref_votes")?,
            preferential_percentage: attr_decimal(candidate, "pref_pct")?,
            elected: attr_flag(candidate, "elected"),
        });
    }

    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use tally_common::db::models::SnapshotKind;

    #[test]
    fn candidate_fields_are_extracted() {
        let facts = parse(
            r#"
            <CANDIDATES>
                <CANDIDATE party="P01" region="R03" given_name="Ada"
                           surname="Kovar" title_before="Ing." title_after=""
                           position="2" pref_votes="15230" pref_pct="8,41"
                           elected="1"/>
                <CANDIDATE party="P02" region="R03" given_name="Tomas"
                           surname="Brabec" position="5" pref_votes="310"/>
            </CANDIDATES>
            "#,
            SnapshotKind::Candidates,
            None,
        )
        .expect("parses");

        assert_eq!(facts.candidates.len(), 2);

        let first = &facts.candidates[0];
        assert_eq!(first.surname, "Kovar");
        assert_eq!(first.title_before, "Ing.");
        assert_eq!(first.list_position, 2);
        assert_eq!(first.preferential_votes, 15230);
        assert!((first.preferential_percentage - 8.41).abs() < 1e-9);
        assert!(first.elected);

        let second = &facts.candidates[1];
        assert!(!second.elected);
        assert_eq!(second.preferential_percentage, 0.0);
    }
}
