//! Database row models and domain enums

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document family of a raw snapshot, determining its parse strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    National,
    RegionalCities,
    District,
    Candidates,
    Abroad,
    PrecinctBatch,
    MunicipalityBatch,
    DistrictBatch,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::National => "national",
            Self::RegionalCities => "regional_cities",
            Self::District => "district",
            Self::Candidates => "candidates",
            Self::Abroad => "abroad",
            Self::PrecinctBatch => "precinct_batch",
            Self::MunicipalityBatch => "municipality_batch",
            Self::DistrictBatch => "district_batch",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "national" => Some(Self::National),
            "regional_cities" => Some(Self::RegionalCities),
            "district" => Some(Self::District),
            "candidates" => Some(Self::Candidates),
            "abroad" => Some(Self::Abroad),
            "precinct_batch" => Some(Self::PrecinctBatch),
            "municipality_batch" => Some(Self::MunicipalityBatch),
            "district_batch" => Some(Self::DistrictBatch),
            _ => None,
        }
    }

    /// The three families published as numbered batch sequences.
    pub fn batch_families() -> [SnapshotKind; 3] {
        [
            Self::PrecinctBatch,
            Self::MunicipalityBatch,
            Self::DistrictBatch,
        ]
    }

    /// URL path prefix for batch families; `None` for non-batch kinds.
    pub fn batch_path(&self) -> Option<&'static str> {
        match self {
            Self::PrecinctBatch => Some("precincts/results_precincts"),
            Self::MunicipalityBatch => Some("municipalities/results_municipalities"),
            Self::DistrictBatch => Some("districts_inc/results_districts"),
            _ => None,
        }
    }
}

/// Administrative level of a region. Regions form a tree via `parent_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Country,
    Region,
    District,
    Municipality,
    Abroad,
    ForeignCountry,
}

impl RegionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Region => "region",
            Self::District => "district",
            Self::Municipality => "municipality",
            Self::Abroad => "abroad",
            Self::ForeignCountry => "foreign_country",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "country" => Some(Self::Country),
            "region" => Some(Self::Region),
            "district" => Some(Self::District),
            "municipality" => Some(Self::Municipality),
            "abroad" => Some(Self::Abroad),
            "foreign_country" => Some(Self::ForeignCountry),
            _ => None,
        }
    }

    /// The next coarser level, used when a child document references a
    /// parent region that has never been published on its own.
    pub fn parent_kind(&self) -> RegionKind {
        match self {
            Self::Municipality => Self::District,
            Self::District => Self::Region,
            Self::Region => Self::Country,
            Self::ForeignCountry => Self::Abroad,
            Self::Country => Self::Country,
            Self::Abroad => Self::Abroad,
        }
    }
}

/// One fetched publisher document, append-only. `processed` is the only
/// field ever mutated.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub id: i64,
    pub kind: String,
    pub source_id: Option<String>,
    pub content: String,
    pub captured_at: DateTime<Utc>,
    pub processed: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Party {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub ballot_number: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub kind: String,
    pub parent_code: Option<String>,
}

/// One observation of a party's tally in a region. Append-only stream;
/// many rows per (region, party) over time.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PointResult {
    pub id: i64,
    pub captured_at: DateTime<Utc>,
    pub region_id: i64,
    pub party_id: i64,
    pub votes: i64,
    pub percentage: f64,
    pub mandates: i64,
}

/// One observation of a region's counting progress. Append-only stream.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PointProgress {
    pub id: i64,
    pub captured_at: DateTime<Utc>,
    pub region_id: i64,
    pub counted_precincts: i64,
    pub total_precincts: i64,
    pub counted_percentage: f64,
    pub registered_voters: i64,
    pub ballots_issued: i64,
    pub valid_votes: i64,
    pub turnout_percentage: f64,
}

/// Current-state candidate entity; later sightings overwrite tallies in
/// place rather than appending.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub party_id: i64,
    pub region_id: i64,
    pub given_name: String,
    pub surname: String,
    pub title_before: Option<String>,
    pub title_after: Option<String>,
    pub list_position: i64,
    pub preferential_votes: i64,
    pub preferential_percentage: f64,
    pub elected: bool,
    pub updated_at: DateTime<Utc>,
}

/// Canonical per-minute record; exactly one per (minute, region, party).
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub id: i64,
    pub minute: DateTime<Utc>,
    pub region_id: i64,
    pub party_id: i64,
    pub votes: i64,
    pub percentage: f64,
    pub counted_precincts: i64,
    pub total_precincts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_kind_round_trips() {
        for kind in [
            SnapshotKind::National,
            SnapshotKind::RegionalCities,
            SnapshotKind::District,
            SnapshotKind::Candidates,
            SnapshotKind::Abroad,
            SnapshotKind::PrecinctBatch,
            SnapshotKind::MunicipalityBatch,
            SnapshotKind::DistrictBatch,
        ] {
            assert_eq!(SnapshotKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SnapshotKind::parse("bogus"), None);
    }

    #[test]
    fn only_batch_families_have_paths() {
        for family in SnapshotKind::batch_families() {
            assert!(family.batch_path().is_some());
        }
        assert!(SnapshotKind::National.batch_path().is_none());
    }

    #[test]
    fn placeholder_parent_is_coarser() {
        assert_eq!(
            RegionKind::Municipality.parent_kind(),
            RegionKind::District
        );
        assert_eq!(RegionKind::District.parent_kind(), RegionKind::Region);
        assert_eq!(
            RegionKind::ForeignCountry.parent_kind(),
            RegionKind::Abroad
        );
    }
}
