//! Minute aggregation
//!
//! Folds the append-only observation stream into exactly one canonical
//! record per (minute, region, party). Within a bucket the latest
//! observation wins; ties on the timestamp fall back to append order so
//! selection stays deterministic. Revisiting a minute after late-arriving
//! data upserts the published record in place (eventual correction).

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use tally_common::{time, Result};

/// Advance the aggregation cursor through the current wall-clock minute.
pub async fn aggregate(pool: &SqlitePool) -> Result<u64> {
    aggregate_up_to(pool, time::now()).await
}

/// Advance the cursor through `now`'s minute, inclusive. Split from
/// [`aggregate`] so the walk is deterministic under test.
///
/// The cursor resumes after the last aggregated minute, or at the minute
/// of the earliest observation on the first run. Buckets with no
/// observations write nothing and the cursor still advances. On error the
/// whole pass is abandoned; the cursor derives from stored rows, so
/// nothing advances and the next tick retries.
pub async fn aggregate_up_to(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let Some(start) = cursor_start(pool).await? else {
        return Ok(0); // nothing observed yet
    };
    let end = time::truncate_to_minute(now);

    let mut minute = start;
    let mut written = 0u64;
    while minute <= end {
        written += aggregate_minute(pool, minute).await?;
        minute += Duration::minutes(1);
    }

    if written > 0 {
        tracing::info!(written, up_to = %end, "minute aggregation complete");
    }
    Ok(written)
}

async fn cursor_start(pool: &SqlitePool) -> Result<Option<DateTime<Utc>>> {
    let last: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT MAX(minute) FROM aggregated_results")
            .fetch_one(pool)
            .await?;
    if let Some(last) = last {
        return Ok(Some(last + Duration::minutes(1)));
    }

    let first: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT MIN(captured_at) FROM point_results")
            .fetch_one(pool)
            .await?;
    Ok(first.map(time::truncate_to_minute))
}

/// Aggregate one bucket `[minute, minute + 1)`. One transaction per
/// minute so long reads never sit behind a whole-pass transaction.
async fn aggregate_minute(pool: &SqlitePool, minute: DateTime<Utc>) -> Result<u64> {
    let next = minute + Duration::minutes(1);

    let groups: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT DISTINCT region_id, party_id FROM point_results \
         WHERE captured_at >= ? AND captured_at < ?",
    )
    .bind(minute)
    .bind(next)
    .fetch_all(pool)
    .await?;

    if groups.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0u64;
    for (region_id, party_id) in groups {
        let row: Option<(i64, f64)> = sqlx::query_as(
            "SELECT votes, percentage FROM point_results \
             WHERE region_id = ? AND party_id = ? AND captured_at >= ? AND captured_at < ? \
             ORDER BY captured_at DESC, id DESC LIMIT 1",
        )
        .bind(region_id)
        .bind(party_id)
        .bind(minute)
        .bind(next)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((votes, percentage)) = row else {
            continue;
        };

        let progress: Option<(i64, i64)> = sqlx::query_as(
            "SELECT counted_precincts, total_precincts FROM point_progress \
             WHERE region_id = ? AND captured_at >= ? AND captured_at < ? \
             ORDER BY captured_at DESC, id DESC LIMIT 1",
        )
        .bind(region_id)
        .bind(minute)
        .bind(next)
        .fetch_optional(&mut *tx)
        .await?;
        let (counted_precincts, total_precincts) = progress.unwrap_or((0, 0));

        sqlx::query(
            "INSERT INTO aggregated_results \
             (minute, region_id, party_id, votes, percentage, counted_precincts, total_precincts) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(minute, region_id, party_id) DO UPDATE SET \
             votes = excluded.votes, percentage = excluded.percentage, \
             counted_precincts = excluded.counted_precincts, \
             total_precincts = excluded.total_precincts",
        )
        .bind(minute)
        .bind(region_id)
        .bind(party_id)
        .bind(votes)
        .bind(percentage)
        .bind(counted_precincts)
        .bind(total_precincts)
        .execute(&mut *tx)
        .await?;
        written += 1;
    }
    tx.commit().await?;

    Ok(written)
}
