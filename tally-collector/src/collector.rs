//! Collection scheduler
//!
//! Independent cooperative task families, each on its own cadence behind a
//! shared cancellation token: a fast poll for the always-published
//! documents, a slower per-district sweep, a wall-clock batch probe, and
//! the ingest + aggregate pipeline. Families fail independently: an error
//! escaping a tick body is logged and the family sleeps out a cooldown;
//! nothing but cancellation stops a family.
//!
//! Every fetched document is appended to the raw snapshot log before any
//! parsing happens, so a crash after a fetch delays processing but never
//! loses data.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use sqlx::SqlitePool;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use tally_common::config::CollectorConfig;
use tally_common::db::models::SnapshotKind;
use tally_common::{time, Result};

use crate::db;
use crate::fetch::{SnapshotFetcher, Transport};
use crate::{aggregate, ingest};

/// Districts fetched concurrently during one sweep.
const DISTRICT_FETCH_CONCURRENCY: usize = 4;

/// Batch sequence numbers already claimed per family. Owned by the probe
/// task and threaded through explicitly rather than living in process-wide
/// state.
#[derive(Debug, Default)]
pub struct BatchProbeState {
    claimed: HashMap<SnapshotKind, HashSet<u32>>,
}

impl BatchProbeState {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_claimed(&self, family: SnapshotKind, number: u32) -> bool {
        self.claimed
            .get(&family)
            .is_some_and(|numbers| numbers.contains(&number))
    }

    fn claim(&mut self, family: SnapshotKind, number: u32) {
        self.claimed.entry(family).or_default().insert(number);
    }
}

pub struct Collector<T: Transport> {
    fetcher: SnapshotFetcher<T>,
    pool: SqlitePool,
    config: CollectorConfig,
}

impl<T: Transport + 'static> Collector<T> {
    pub fn new(fetcher: SnapshotFetcher<T>, pool: SqlitePool, config: CollectorConfig) -> Self {
        Self {
            fetcher,
            pool,
            config,
        }
    }

    /// Run all task families until the token is cancelled. Each tick's
    /// writes are durable before the next tick begins, so cancellation
    /// between ticks flushes no partial state.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let poll = tokio::spawn(Self::poll_task(self.clone(), cancel.clone()));
        let districts = tokio::spawn(Self::district_task(self.clone(), cancel.clone()));
        let batches = tokio::spawn(Self::batch_task(self.clone(), cancel.clone()));
        let pipeline = tokio::spawn(Self::pipeline_task(self.clone(), cancel));
        let _ = tokio::join!(poll, districts, batches, pipeline);
    }

    async fn poll_task(this: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = interval(this.config.poll_interval_secs);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = this.poll_core().await {
                        tracing::error!(error = %e, "core poll failed");
                        this.cooldown().await;
                    }
                }
            }
        }
        tracing::info!("core poll task stopped");
    }

    async fn district_task(this: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = interval(this.config.district_poll_secs);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = this.poll_districts().await {
                        tracing::error!(error = %e, "district sweep failed");
                        this.cooldown().await;
                    }
                }
            }
        }
        tracing::info!("district sweep task stopped");
    }

    async fn batch_task(this: Arc<Self>, cancel: CancellationToken) {
        let mut state = BatchProbeState::new();
        let mut ticker = interval(this.config.batch_probe_secs);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = this.probe_batches(&mut state).await {
                        tracing::error!(error = %e, "batch probe failed");
                        this.cooldown().await;
                    }
                }
            }
        }
        tracing::info!("batch probe task stopped");
    }

    async fn pipeline_task(this: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = interval(this.config.pipeline_secs);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = this.run_pipeline().await {
                        tracing::error!(error = %e, "pipeline pass failed");
                        this.cooldown().await;
                    }
                }
            }
        }
        tracing::info!("pipeline task stopped");
    }

    /// Fetch the always-published document kinds.
    async fn poll_core(&self) -> Result<()> {
        let targets = [
            (SnapshotKind::National, "results.xml"),
            (SnapshotKind::RegionalCities, "results_cities.xml"),
            (SnapshotKind::Abroad, "results_abroad.xml"),
            (SnapshotKind::Candidates, "results_candidates.xml"),
        ];
        for (kind, path) in targets {
            let url = self.url(path);
            self.fetch_and_store(kind, None, &url).await?;
        }
        Ok(())
    }

    /// Sweep every configured district. Fetches run concurrently with a
    /// bounded buffer; the resulting appends stay sequential so each one
    /// is an atomic insert.
    async fn poll_districts(&self) -> Result<()> {
        if self.config.district_codes.is_empty() {
            return Ok(());
        }

        let fetched: Vec<(String, Option<String>)> =
            stream::iter(self.config.district_codes.iter().cloned())
                .map(|code| async move {
                    let url = self.url(&format!("districts/results_district_{code}.xml"));
                    (code, self.fetcher.fetch(&url).await)
                })
                .buffer_unordered(DISTRICT_FETCH_CONCURRENCY)
                .collect()
                .await;

        let mut stored = 0usize;
        for (code, content) in fetched {
            if let Some(content) = content {
                db::raw::append(
                    &self.pool,
                    SnapshotKind::District,
                    Some(code.as_str()),
                    &content,
                    time::now(),
                )
                .await?;
                stored += 1;
            }
        }

        tracing::info!(
            stored,
            districts = self.config.district_codes.len(),
            "district sweep complete"
        );
        Ok(())
    }

    async fn probe_batches(&self, state: &mut BatchProbeState) -> Result<()> {
        for family in SnapshotKind::batch_families() {
            self.probe_family(family, state).await?;
        }
        Ok(())
    }

    /// Walk a family's numbered sequence from 1, skipping already-claimed
    /// numbers and stopping at the first number the publisher does not
    /// have. Claimed numbers are never fetched again.
    async fn probe_family(&self, family: SnapshotKind, state: &mut BatchProbeState) -> Result<()> {
        let Some(path) = family.batch_path() else {
            return Ok(());
        };

        for number in 1..=self.config.max_batch_number {
            if state.is_claimed(family, number) {
                continue;
            }

            let source_id = format!("{number:05}");
            let url = self.url(&format!("{path}_{source_id}.xml"));
            if !self.fetch_and_store(family, Some(&source_id), &url).await? {
                break;
            }

            state.claim(family, number);
            tracing::info!(family = family.as_str(), number, "batch claimed");
        }
        Ok(())
    }

    /// Drain raw snapshots into the canonical store, then advance the
    /// minute aggregation cursor.
    async fn run_pipeline(&self) -> Result<()> {
        ingest::process_all(&self.pool).await?;
        aggregate::aggregate(&self.pool).await?;
        Ok(())
    }

    /// Fetch one document and append it raw. Returns whether the document
    /// was available.
    async fn fetch_and_store(
        &self,
        kind: SnapshotKind,
        source_id: Option<&str>,
        url: &str,
    ) -> Result<bool> {
        let Some(content) = self.fetcher.fetch(url).await else {
            return Ok(false);
        };
        db::raw::append(&self.pool, kind, source_id, &content, time::now()).await?;
        tracing::debug!(kind = kind.as_str(), url, "snapshot stored");
        Ok(true)
    }

    async fn cooldown(&self) {
        tokio::time::sleep(Duration::from_secs(self.config.error_cooldown_secs)).await;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

fn interval(secs: u64) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Mutex;

    /// Serves exactly the configured URLs; everything else is absent.
    struct MapTransport {
        available: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl MapTransport {
        fn new(available: HashMap<String, String>) -> Self {
            Self {
                available,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().expect("request log").clone()
        }
    }

    impl Transport for MapTransport {
        async fn get(&self, url: &str) -> std::result::Result<String, crate::fetch::TransportError> {
            self.requests.lock().expect("request log").push(url.to_string());
            match self.available.get(url) {
                Some(body) => Ok(body.clone()),
                None => Err(crate::fetch::TransportError::Absent),
            }
        }
    }

    async fn mem_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        tally_common::db::schema::init_tables(&pool)
            .await
            .expect("schema");
        pool
    }

    fn collector_with(
        available: HashMap<String, String>,
        config: CollectorConfig,
        pool: SqlitePool,
    ) -> Collector<MapTransport> {
        let fetcher = SnapshotFetcher::with_transport(
            MapTransport::new(available),
            3,
            Duration::from_millis(1),
        );
        Collector::new(fetcher, pool, config)
    }

    async fn raw_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM raw_snapshots")
            .fetch_one(pool)
            .await
            .expect("count")
    }

    #[tokio::test]
    async fn batch_probe_stops_at_first_absence() {
        let config = CollectorConfig {
            base_url: "http://pub".to_string(),
            ..CollectorConfig::default()
        };
        let mut available = HashMap::new();
        for number in 1..=5u32 {
            available.insert(
                format!("http://pub/municipalities/results_municipalities_{number:05}.xml"),
                format!("<MUNICIPALITY_BATCH seq=\"{number:05}\"/>"),
            );
        }

        let pool = mem_pool().await;
        let collector = collector_with(available, config, pool.clone());

        let mut state = BatchProbeState::new();
        collector
            .probe_family(SnapshotKind::MunicipalityBatch, &mut state)
            .await
            .expect("probe");

        assert_eq!(raw_count(&pool).await, 5);

        let requests = collector.fetcher.transport().requests();
        // numbers 1..=5 fetched, 6 probed and absent, 7+ never attempted
        assert_eq!(requests.len(), 6);
        assert!(requests.iter().all(|url| !url.contains("00007")));
    }

    #[tokio::test]
    async fn claimed_batches_are_not_refetched() {
        let config = CollectorConfig {
            base_url: "http://pub".to_string(),
            ..CollectorConfig::default()
        };
        let mut available = HashMap::new();
        available.insert(
            "http://pub/precincts/results_precincts_00001.xml".to_string(),
            "<PRECINCT_BATCH/>".to_string(),
        );

        let pool = mem_pool().await;
        let collector = collector_with(available, config, pool.clone());

        let mut state = BatchProbeState::new();
        collector
            .probe_family(SnapshotKind::PrecinctBatch, &mut state)
            .await
            .expect("first probe");
        let after_first = collector.fetcher.transport().requests().len();
        assert_eq!(after_first, 2); // 00001 fetched, 00002 absent

        collector
            .probe_family(SnapshotKind::PrecinctBatch, &mut state)
            .await
            .expect("second probe");
        let second_pass: Vec<String> =
            collector.fetcher.transport().requests()[after_first..].to_vec();
        // only the still-unclaimed 00002 is probed again
        assert_eq!(second_pass.len(), 1);
        assert!(second_pass[0].contains("00002"));

        assert_eq!(raw_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn core_poll_stores_every_available_kind() {
        let config = CollectorConfig {
            base_url: "http://pub".to_string(),
            ..CollectorConfig::default()
        };
        let mut available = HashMap::new();
        available.insert(
            "http://pub/results.xml".to_string(),
            "<RESULTS/>".to_string(),
        );
        available.insert(
            "http://pub/results_candidates.xml".to_string(),
            "<CANDIDATES/>".to_string(),
        );

        let pool = mem_pool().await;
        let collector = collector_with(available, config, pool.clone());

        collector.poll_core().await.expect("poll");

        // the two unavailable kinds are skipped, not errors
        assert_eq!(raw_count(&pool).await, 2);
        let kinds: Vec<String> =
            sqlx::query_scalar("SELECT kind FROM raw_snapshots ORDER BY id")
                .fetch_all(&pool)
                .await
                .expect("kinds");
        assert_eq!(kinds, vec!["national".to_string(), "candidates".to_string()]);
    }
}
