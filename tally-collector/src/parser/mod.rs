//! Snapshot document parsing
//!
//! Converts one raw XML document plus its declared kind into a normalized
//! [`FactSet`]. Parsing is pure: no storage access, no clock access. Each
//! kind has its own extraction routine, but every routine reduces to the
//! same write-set so the ingestor never branches on document shape.
//!
//! A missing optional attribute defaults to zero or empty; unparseable
//! markup, a wrong root element, or a malformed numeric value is a typed
//! [`ParseError`] the caller logs and discards. Decimal attributes accept
//! a comma as the decimal separator.

mod abroad;
mod batch;
mod candidates;
mod cities;
mod district;
mod national;

use roxmltree::{Document, Node};
use thiserror::Error;

use tally_common::db::models::{RegionKind, SnapshotKind};

/// Synthetic root region for nationwide tallies, created lazily on first
/// sighting of a national document.
pub const NATION_CODE: &str = "NATION";
pub const NATION_NAME: &str = "Nationwide";

/// Synthetic region collecting votes cast abroad.
pub const ABROAD_CODE: &str = "ABROAD";
pub const ABROAD_NAME: &str = "Abroad";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed document: {0}")]
    Malformed(#[from] roxmltree::Error),

    #[error("unexpected root element `{0}`")]
    UnexpectedRoot(String),

    #[error("missing required attribute `{0}`")]
    MissingAttribute(&'static str),

    #[error("invalid number in `{attr}`: `{value}`")]
    InvalidNumber { attr: &'static str, value: String },
}

/// Party identity as published. Only some kinds carry the full identity;
/// tallies elsewhere reference parties by code alone.
#[derive(Debug, Clone, PartialEq)]
pub struct PartyFact {
    pub code: String,
    pub name: String,
    pub ballot_number: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionFact {
    pub code: String,
    pub name: String,
    pub kind: RegionKind,
    pub parent_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultFact {
    pub region_code: String,
    pub party_code: String,
    pub votes: i64,
    pub percentage: f64,
    pub mandates: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressFact {
    pub region_code: String,
    pub counted_precincts: i64,
    pub total_precincts: i64,
    pub counted_percentage: f64,
    pub registered_voters: i64,
    pub ballots_issued: i64,
    pub valid_votes: i64,
    pub turnout_percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFact {
    pub party_code: String,
    pub region_code: String,
    pub given_name: String,
    pub surname: String,
    pub title_before: String,
    pub title_after: String,
    pub list_position: i64,
    pub preferential_votes: i64,
    pub preferential_percentage: f64,
    pub elected: bool,
}

/// Normalized output of parsing one snapshot, whatever its kind.
#[derive(Debug, Clone, Default)]
pub struct FactSet {
    pub parties: Vec<PartyFact>,
    pub regions: Vec<RegionFact>,
    pub results: Vec<ResultFact>,
    pub progress: Vec<ProgressFact>,
    pub candidates: Vec<CandidateFact>,
}

impl FactSet {
    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
            && self.regions.is_empty()
            && self.results.is_empty()
            && self.progress.is_empty()
            && self.candidates.is_empty()
    }
}

/// Parse one document according to its kind. `source_id` is the fetch
/// path's identifier (district code or batch number), used as a fallback
/// where the document itself omits it.
pub fn parse(
    content: &str,
    kind: SnapshotKind,
    source_id: Option<&str>,
) -> Result<FactSet, ParseError> {
    let doc = Document::parse(content)?;
    let root = doc.root_element();
    match kind {
        SnapshotKind::National => national::parse(root),
        SnapshotKind::RegionalCities => cities::parse(root),
        SnapshotKind::District => district::parse(root, source_id),
        SnapshotKind::Candidates => candidates::parse(root),
        SnapshotKind::Abroad => abroad::parse(root),
        SnapshotKind::PrecinctBatch => batch::parse_precincts(root),
        SnapshotKind::MunicipalityBatch => batch::parse_municipalities(root),
        SnapshotKind::DistrictBatch => batch::parse_districts(root),
    }
}

// ---- shared extraction helpers ----

fn expect_root(root: Node, name: &str) -> Result<(), ParseError> {
    if root.has_tag_name(name) {
        Ok(())
    } else {
        Err(ParseError::UnexpectedRoot(
            root.tag_name().name().to_string(),
        ))
    }
}

fn elements<'a, 'input>(
    parent: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    parent.children().filter(move |n| n.has_tag_name(name))
}

fn req_attr<'a>(node: Node<'a, '_>, name: &'static str) -> Result<&'a str, ParseError> {
    node.attribute(name).ok_or(ParseError::MissingAttribute(name))
}

fn attr_str(node: Node, name: &str) -> String {
    node.attribute(name).unwrap_or_default().to_string()
}

/// Integer attribute; absent means zero.
fn attr_i64(node: Node, name: &'static str) -> Result<i64, ParseError> {
    match node.attribute(name) {
        None => Ok(0),
        Some(raw) => raw.trim().parse().map_err(|_| ParseError::InvalidNumber {
            attr: name,
            value: raw.to_string(),
        }),
    }
}

/// Decimal attribute; absent means zero. The publisher's locale uses a
/// comma as the decimal separator.
fn attr_decimal(node: Node, name: &'static str) -> Result<f64, ParseError> {
    match node.attribute(name) {
        None => Ok(0.0),
        Some(raw) => raw
            .trim()
            .replace(',', ".")
            .parse()
            .map_err(|_| ParseError::InvalidNumber {
                attr: name,
                value: raw.to_string(),
            }),
    }
}

/// Flag attribute, `"1"` meaning set.
fn attr_flag(node: Node, name: &str) -> bool {
    node.attribute(name) == Some("1")
}

/// Counting-progress counters shared by national and district documents.
fn progress_fact(node: Node, region_code: &str) -> Result<ProgressFact, ParseError> {
    Ok(ProgressFact {
        region_code: region_code.to_string(),
        counted_precincts: attr_i64(node, "precincts_counted")?,
        total_precincts: attr_i64(node, "precincts_total")?,
        counted_percentage: attr_decimal(node, "counted_pct")?,
        registered_voters: attr_i64(node, "registered_voters")?,
        ballots_issued: attr_i64(node, "ballots_issued")?,
        valid_votes: attr_i64(node, "valid_votes")?,
        turnout_percentage: attr_decimal(node, "turnout_pct")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_decimal_is_normalized() {
        let doc = Document::parse(r#"<X pct="12,34"/>"#).expect("valid xml");
        let value = attr_decimal(doc.root_element(), "pct").expect("parses");
        assert!((value - 12.34).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_numeric_attributes_default_to_zero() {
        let doc = Document::parse("<X/>").expect("valid xml");
        assert_eq!(attr_i64(doc.root_element(), "votes").expect("defaults"), 0);
        assert_eq!(
            attr_decimal(doc.root_element(), "pct").expect("defaults"),
            0.0
        );
    }

    #[test]
    fn malformed_number_is_a_typed_error() {
        let doc = Document::parse(r#"<X votes="n/a"/>"#).expect("valid xml");
        let err = attr_i64(doc.root_element(), "votes").expect_err("rejects");
        assert!(matches!(err, ParseError::InvalidNumber { attr: "votes", .. }));
    }

    #[test]
    fn unparseable_markup_is_a_parse_error() {
        let err = parse("<RESULTS><PARTY", SnapshotKind::National, None)
            .expect_err("truncated document");
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn wrong_root_element_is_rejected() {
        let err = parse("<CANDIDATES/>", SnapshotKind::National, None).expect_err("wrong root");
        assert!(matches!(err, ParseError::UnexpectedRoot(name) if name == "CANDIDATES"));
    }
}
