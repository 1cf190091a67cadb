//! Collector configuration loading
//!
//! Configuration comes from a TOML file with every field defaulted, so an
//! empty file (or none at all) yields a runnable development setup. The
//! database path follows the priority order: command-line argument,
//! `TALLY_DATABASE` environment variable, config file value.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configured database path.
pub const DATABASE_ENV_VAR: &str = "TALLY_DATABASE";

/// Top-level collector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Publisher base URL; snapshot paths are appended to it.
    pub base_url: String,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// District codes enumerated during the district sweep. An empty list
    /// leaves the sweep idle.
    pub district_codes: Vec<String>,
    /// Cadence of the fast poll (national, cities, abroad, candidates).
    pub poll_interval_secs: u64,
    /// Cadence of the per-district sweep.
    pub district_poll_secs: u64,
    /// Cadence of the numbered batch probe.
    pub batch_probe_secs: u64,
    /// Cadence of the ingest + aggregate pipeline.
    pub pipeline_secs: u64,
    /// Sleep after an error escapes a task family's tick body.
    pub error_cooldown_secs: u64,
    /// Upper bound on batch sequence numbers probed in one pass.
    pub max_batch_number: u32,
    pub fetch: FetchConfig,
}

/// Per-document fetch behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempts per document before giving up for this tick.
    pub max_attempts: u32,
    /// First backoff delay; doubles on every further attempt.
    pub base_delay_ms: u64,
    /// Per-attempt request timeout.
    pub timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/results".to_string(),
            database_path: PathBuf::from("tally.db"),
            district_codes: Vec::new(),
            poll_interval_secs: 1,
            district_poll_secs: 10,
            batch_probe_secs: 60,
            pipeline_secs: 30,
            error_cooldown_secs: 5,
            max_batch_number: 9999,
            fetch: FetchConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            timeout_secs: 10,
        }
    }
}

impl CollectorConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Resolve the database path: CLI argument, then `TALLY_DATABASE`,
    /// then the configured value.
    pub fn resolve_database_path(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
            return PathBuf::from(path);
        }
        self.database_path.clone()
    }
}
