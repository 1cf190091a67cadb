//! Raw snapshot log (append-only)
//!
//! Fetched documents land here before any parsing, tagged with kind,
//! optional source identifier, and capture time. Content is immutable;
//! only the processed flag is ever flipped.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use tally_common::db::models::{RawSnapshot, SnapshotKind};
use tally_common::Result;

/// Append one fetched document. Each append is its own atomic insert, so
/// concurrent fetch workers never interleave partial documents.
pub async fn append(
    pool: &SqlitePool,
    kind: SnapshotKind,
    source_id: Option<&str>,
    content: &str,
    captured_at: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO raw_snapshots (kind, source_id, content, captured_at, processed) \
         VALUES (?, ?, ?, ?, 0)",
    )
    .bind(kind.as_str())
    .bind(source_id)
    .bind(content)
    .bind(captured_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Unprocessed snapshots in capture order; ties broken by append order.
pub async fn unprocessed(pool: &SqlitePool) -> Result<Vec<RawSnapshot>> {
    let rows = sqlx::query_as::<_, RawSnapshot>(
        "SELECT id, kind, source_id, content, captured_at, processed \
         FROM raw_snapshots WHERE processed = 0 \
         ORDER BY captured_at ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn mark_processed(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("UPDATE raw_snapshots SET processed = 1 WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
