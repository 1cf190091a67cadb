//! Party and region identity upserts and lookups
//!
//! Identity fields are write-once: the first sighting creates the row,
//! later sightings never overwrite it.

use sqlx::SqliteConnection;

use tally_common::db::models::RegionKind;
use tally_common::Result;

use crate::parser::{PartyFact, RegionFact};

pub async fn ensure_party(conn: &mut SqliteConnection, fact: &PartyFact) -> Result<()> {
    sqlx::query(
        "INSERT INTO parties (code, name, ballot_number) VALUES (?, ?, ?) \
         ON CONFLICT(code) DO NOTHING",
    )
    .bind(&fact.code)
    .bind(&fact.name)
    .bind(fact.ballot_number)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn party_id(conn: &mut SqliteConnection, code: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM parties WHERE code = ?")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id)
}

pub async fn region_id(conn: &mut SqliteConnection, code: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM regions WHERE code = ?")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id)
}

pub async fn ensure_region(conn: &mut SqliteConnection, fact: &RegionFact) -> Result<()> {
    if region_id(&mut *conn, &fact.code).await?.is_some() {
        return Ok(());
    }

    if let Some(parent_code) = &fact.parent_code {
        ensure_parent_placeholder(&mut *conn, parent_code, fact.kind).await?;
    }

    let name = if fact.name.is_empty() {
        &fact.code
    } else {
        &fact.name
    };
    sqlx::query(
        "INSERT INTO regions (code, name, kind, parent_code) VALUES (?, ?, ?, ?) \
         ON CONFLICT(code) DO NOTHING",
    )
    .bind(&fact.code)
    .bind(name)
    .bind(fact.kind.as_str())
    .bind(&fact.parent_code)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// A child may be published before its parent ever appears on its own.
/// The parent is created as a placeholder (name = code, next coarser
/// kind) so the region tree never holds a dangling reference.
async fn ensure_parent_placeholder(
    conn: &mut SqliteConnection,
    code: &str,
    child_kind: RegionKind,
) -> Result<()> {
    if region_id(&mut *conn, code).await?.is_some() {
        return Ok(());
    }

    let kind = child_kind.parent_kind();
    sqlx::query(
        "INSERT INTO regions (code, name, kind, parent_code) VALUES (?, ?, ?, NULL) \
         ON CONFLICT(code) DO NOTHING",
    )
    .bind(code)
    .bind(code)
    .bind(kind.as_str())
    .execute(&mut *conn)
    .await?;

    tracing::debug!(code, kind = kind.as_str(), "created placeholder parent region");
    Ok(())
}
