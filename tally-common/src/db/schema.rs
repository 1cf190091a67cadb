//! Canonical store schema
//!
//! Seven tables: the append-only raw snapshot log, the entity tables
//! (parties, regions, candidates), the two point-in-time observation
//! streams, and the per-minute aggregate written only by the aggregator.
//! All statements are idempotent so startup re-runs them safely.

use crate::Result;
use sqlx::SqlitePool;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS raw_snapshots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        source_id TEXT,
        content TEXT NOT NULL,
        captured_at TEXT NOT NULL,
        processed INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS parties (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        ballot_number INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS regions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        kind TEXT NOT NULL,
        parent_code TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS point_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        captured_at TEXT NOT NULL,
        region_id INTEGER NOT NULL REFERENCES regions(id),
        party_id INTEGER NOT NULL REFERENCES parties(id),
        votes INTEGER NOT NULL DEFAULT 0,
        percentage REAL NOT NULL DEFAULT 0.0,
        mandates INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS point_progress (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        captured_at TEXT NOT NULL,
        region_id INTEGER NOT NULL REFERENCES regions(id),
        counted_precincts INTEGER NOT NULL DEFAULT 0,
        total_precincts INTEGER NOT NULL DEFAULT 0,
        counted_percentage REAL NOT NULL DEFAULT 0.0,
        registered_voters INTEGER NOT NULL DEFAULT 0,
        ballots_issued INTEGER NOT NULL DEFAULT 0,
        valid_votes INTEGER NOT NULL DEFAULT 0,
        turnout_percentage REAL NOT NULL DEFAULT 0.0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS candidates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        party_id INTEGER NOT NULL REFERENCES parties(id),
        region_id INTEGER NOT NULL REFERENCES regions(id),
        given_name TEXT NOT NULL,
        surname TEXT NOT NULL,
        title_before TEXT,
        title_after TEXT,
        list_position INTEGER NOT NULL DEFAULT 0,
        preferential_votes INTEGER NOT NULL DEFAULT 0,
        preferential_percentage REAL NOT NULL DEFAULT 0.0,
        elected INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL,
        UNIQUE (party_id, region_id, surname, given_name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS aggregated_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        minute TEXT NOT NULL,
        region_id INTEGER NOT NULL REFERENCES regions(id),
        party_id INTEGER NOT NULL REFERENCES parties(id),
        votes INTEGER NOT NULL DEFAULT 0,
        percentage REAL NOT NULL DEFAULT 0.0,
        counted_precincts INTEGER NOT NULL DEFAULT 0,
        total_precincts INTEGER NOT NULL DEFAULT 0,
        UNIQUE (minute, region_id, party_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_raw_snapshots_captured ON raw_snapshots (captured_at)",
    "CREATE INDEX IF NOT EXISTS idx_raw_snapshots_source ON raw_snapshots (kind, source_id)",
    "CREATE INDEX IF NOT EXISTS idx_raw_snapshots_pending ON raw_snapshots (processed, captured_at)",
    "CREATE INDEX IF NOT EXISTS idx_point_results_captured ON point_results (captured_at)",
    "CREATE INDEX IF NOT EXISTS idx_point_results_region_party ON point_results (region_id, party_id, captured_at)",
    "CREATE INDEX IF NOT EXISTS idx_point_progress_captured ON point_progress (captured_at)",
    "CREATE INDEX IF NOT EXISTS idx_point_progress_region ON point_progress (region_id, captured_at)",
    "CREATE INDEX IF NOT EXISTS idx_candidates_party ON candidates (party_id)",
    "CREATE INDEX IF NOT EXISTS idx_candidates_region ON candidates (region_id)",
    "CREATE INDEX IF NOT EXISTS idx_aggregated_minute ON aggregated_results (minute)",
    "CREATE INDEX IF NOT EXISTS idx_aggregated_region ON aggregated_results (region_id, party_id, minute)",
];

/// Create tables and indexes if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database schema initialized");

    Ok(())
}
