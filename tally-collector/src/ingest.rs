//! Raw snapshot ingestion (normalizer)
//!
//! Drains unprocessed raw snapshots in capture order and projects their
//! parsed facts into the canonical store. One transaction per snapshot:
//! either all of a snapshot's writes land together with its processed
//! flag, or none do and the snapshot is retried on a later pass. A
//! malformed document is discarded (marked processed without writes); it
//! will never parse better. One bad snapshot never blocks the queue.
//!
//! Re-running over an already-processed snapshot is a no-op. If a crash
//! lands between the writes and the flag, the re-run appends duplicate
//! observation rows with identical timestamps; the minute aggregator's
//! latest-wins selection is insensitive to that.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use tally_common::db::models::{RawSnapshot, SnapshotKind};
use tally_common::Result;

use crate::db::{self, entities};
use crate::parser::{self, FactSet};

/// Process every unprocessed raw snapshot. Returns how many were
/// fully ingested (discarded malformed ones included).
pub async fn process_all(pool: &SqlitePool) -> Result<usize> {
    let pending = db::raw::unprocessed(pool).await?;
    let total = pending.len();

    let mut processed = 0usize;
    for snapshot in pending {
        match process_one(pool, &snapshot).await {
            Ok(()) => processed += 1,
            Err(e) => {
                // Left unprocessed; the next pass retries it.
                tracing::error!(
                    id = snapshot.id,
                    kind = %snapshot.kind,
                    error = %e,
                    "snapshot ingestion failed"
                );
            }
        }
    }

    if total > 0 {
        tracing::info!(processed, total, "raw snapshot drain complete");
    }
    Ok(processed)
}

async fn process_one(pool: &SqlitePool, snapshot: &RawSnapshot) -> Result<()> {
    let Some(kind) = SnapshotKind::parse(&snapshot.kind) else {
        tracing::warn!(id = snapshot.id, kind = %snapshot.kind, "unknown snapshot kind");
        return discard(pool, snapshot.id).await;
    };

    let facts = match parser::parse(&snapshot.content, kind, snapshot.source_id.as_deref()) {
        Ok(facts) => facts,
        Err(e) => {
            tracing::warn!(
                id = snapshot.id,
                kind = %snapshot.kind,
                error = %e,
                "discarding malformed snapshot"
            );
            return discard(pool, snapshot.id).await;
        }
    };

    let mut tx = pool.begin().await?;
    project(&mut tx, &facts, snapshot.captured_at).await?;
    db::raw::mark_processed(&mut tx, snapshot.id).await?;
    tx.commit().await?;
    Ok(())
}

async fn discard(pool: &SqlitePool, id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;
    db::raw::mark_processed(&mut tx, id).await?;
    tx.commit().await?;
    Ok(())
}

/// Project one fact set, stamping every observation with the snapshot's
/// capture time rather than wall-clock-now.
async fn project(
    conn: &mut SqliteConnection,
    facts: &FactSet,
    captured_at: DateTime<Utc>,
) -> Result<()> {
    for party in &facts.parties {
        entities::ensure_party(&mut *conn, party).await?;
    }

    for region in &facts.regions {
        entities::ensure_region(&mut *conn, region).await?;
    }

    for fact in &facts.results {
        let Some(region_id) = entities::region_id(&mut *conn, &fact.region_code).await? else {
            tracing::debug!(region = %fact.region_code, "result for unknown region skipped");
            continue;
        };
        // Parties come into being only through documents carrying their
        // identity; tallies seen before that are skipped.
        let Some(party_id) = entities::party_id(&mut *conn, &fact.party_code).await? else {
            tracing::debug!(party = %fact.party_code, "result for unknown party skipped");
            continue;
        };
        db::results::insert_result(&mut *conn, captured_at, region_id, party_id, fact).await?;
    }

    for fact in &facts.progress {
        let Some(region_id) = entities::region_id(&mut *conn, &fact.region_code).await? else {
            tracing::debug!(region = %fact.region_code, "progress for unknown region skipped");
            continue;
        };
        db::results::insert_progress(&mut *conn, captured_at, region_id, fact).await?;
    }

    for fact in &facts.candidates {
        let Some(party_id) = entities::party_id(&mut *conn, &fact.party_code).await? else {
            continue;
        };
        let Some(region_id) = entities::region_id(&mut *conn, &fact.region_code).await? else {
            continue;
        };
        db::candidates::upsert(&mut *conn, captured_at, party_id, region_id, fact).await?;
    }

    Ok(())
}
