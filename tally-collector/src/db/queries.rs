//! Canonical-store read surface
//!
//! The query patterns the external API layer consumes, also used by the
//! predictor and the tests. Read-only.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use tally_common::db::models::{
    AggregatedResult, Candidate, Party, PointProgress, PointResult, Region,
};
use tally_common::Result;

pub async fn region_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Region>> {
    let region = sqlx::query_as::<_, Region>(
        "SELECT id, code, name, kind, parent_code FROM regions WHERE code = ?",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;
    Ok(region)
}

pub async fn party_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Party>> {
    let party =
        sqlx::query_as::<_, Party>("SELECT id, code, name, ballot_number FROM parties WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(party)
}

/// Latest N result observations for a region, newest first.
pub async fn latest_results_for_region(
    pool: &SqlitePool,
    region_id: i64,
    limit: i64,
) -> Result<Vec<PointResult>> {
    let rows = sqlx::query_as::<_, PointResult>(
        "SELECT id, captured_at, region_id, party_id, votes, percentage, mandates \
         FROM point_results WHERE region_id = ? \
         ORDER BY captured_at DESC, id DESC LIMIT ?",
    )
    .bind(region_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Most recent progress observation for a region.
pub async fn latest_progress_for_region(
    pool: &SqlitePool,
    region_id: i64,
) -> Result<Option<PointProgress>> {
    let row = sqlx::query_as::<_, PointProgress>(
        "SELECT id, captured_at, region_id, counted_precincts, total_precincts, \
         counted_percentage, registered_voters, ballots_issued, valid_votes, turnout_percentage \
         FROM point_progress WHERE region_id = ? \
         ORDER BY captured_at DESC, id DESC LIMIT 1",
    )
    .bind(region_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Aggregated minute records for a region in `[start, end]`, minute order.
pub async fn aggregated_range(
    pool: &SqlitePool,
    region_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<AggregatedResult>> {
    let rows = sqlx::query_as::<_, AggregatedResult>(
        "SELECT id, minute, region_id, party_id, votes, percentage, \
         counted_precincts, total_precincts \
         FROM aggregated_results \
         WHERE region_id = ? AND minute >= ? AND minute <= ? \
         ORDER BY minute ASC, party_id ASC",
    )
    .bind(region_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Candidates optionally filtered by party and/or region, ordered by
/// preferential votes descending.
pub async fn candidates_filtered(
    pool: &SqlitePool,
    party_id: Option<i64>,
    region_id: Option<i64>,
) -> Result<Vec<Candidate>> {
    let rows = sqlx::query_as::<_, Candidate>(
        "SELECT id, party_id, region_id, given_name, surname, title_before, title_after, \
         list_position, preferential_votes, preferential_percentage, elected, updated_at \
         FROM candidates \
         WHERE (?1 IS NULL OR party_id = ?1) AND (?2 IS NULL OR region_id = ?2) \
         ORDER BY preferential_votes DESC",
    )
    .bind(party_id)
    .bind(region_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
