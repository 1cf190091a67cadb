//! Point-in-time observation streams (results and progress)
//!
//! Append-only: rows are stamped with the snapshot's capture time, never
//! wall-clock-now, so historical reprocessing preserves true event time.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use tally_common::Result;

use crate::parser::{ProgressFact, ResultFact};

pub async fn insert_result(
    conn: &mut SqliteConnection,
    captured_at: DateTime<Utc>,
    region_id: i64,
    party_id: i64,
    fact: &ResultFact,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO point_results (captured_at, region_id, party_id, votes, percentage, mandates) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(captured_at)
    .bind(region_id)
    .bind(party_id)
    .bind(fact.votes)
    .bind(fact.percentage)
    .bind(fact.mandates)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_progress(
    conn: &mut SqliteConnection,
    captured_at: DateTime<Utc>,
    region_id: i64,
    fact: &ProgressFact,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO point_progress (captured_at, region_id, counted_precincts, total_precincts, \
         counted_percentage, registered_voters, ballots_issued, valid_votes, turnout_percentage) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(captured_at)
    .bind(region_id)
    .bind(fact.counted_precincts)
    .bind(fact.total_precincts)
    .bind(fact.counted_percentage)
    .bind(fact.registered_voters)
    .bind(fact.ballots_issued)
    .bind(fact.valid_votes)
    .bind(fact.turnout_percentage)
    .execute(conn)
    .await?;
    Ok(())
}
