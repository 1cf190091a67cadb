//! Candidate preferential-vote tracking
//!
//! Candidates are current-state entities keyed by (party, region, surname,
//! given name): a later sighting overwrites the mutable tallies in place
//! instead of appending. The table's UNIQUE constraint backstops the
//! read-modify-write.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use tally_common::Result;

use crate::parser::CandidateFact;

pub async fn upsert(
    conn: &mut SqliteConnection,
    captured_at: DateTime<Utc>,
    party_id: i64,
    region_id: i64,
    fact: &CandidateFact,
) -> Result<()> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM candidates \
         WHERE party_id = ? AND region_id = ? AND surname = ? AND given_name = ?",
    )
    .bind(party_id)
    .bind(region_id)
    .bind(&fact.surname)
    .bind(&fact.given_name)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE candidates SET preferential_votes = ?, preferential_percentage = ?, \
                 elected = ?, updated_at = ? WHERE id = ?",
            )
            .bind(fact.preferential_votes)
            .bind(fact.preferential_percentage)
            .bind(fact.elected)
            .bind(captured_at)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO candidates (party_id, region_id, given_name, surname, title_before, \
                 title_after, list_position, preferential_votes, preferential_percentage, \
                 elected, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(party_id)
            .bind(region_id)
            .bind(&fact.given_name)
            .bind(&fact.surname)
            .bind(&fact.title_before)
            .bind(&fact.title_after)
            .bind(fact.list_position)
            .bind(fact.preferential_votes)
            .bind(fact.preferential_percentage)
            .bind(fact.elected)
            .bind(captured_at)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}
