//! tally-collector - election snapshot collection service
//!
//! Fetches publisher snapshot documents on independent cadences, appends
//! them to the raw log, normalizes them into the canonical store, and
//! maintains the per-minute aggregate series for dashboard consumers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tally_collector::collector::Collector;
use tally_collector::fetch::SnapshotFetcher;
use tally_common::config::CollectorConfig;

#[derive(Debug, Parser)]
#[command(name = "tally-collector", about = "Election snapshot collection service")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database file, overriding configuration and TALLY_DATABASE
    #[arg(long)]
    database: Option<PathBuf>,

    /// Publisher base URL, overriding the configuration file
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CollectorConfig::load(path)?,
        None => CollectorConfig::default(),
    };
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    let db_path = config.resolve_database_path(args.database.as_deref());

    info!("Starting tally-collector");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Publisher: {}", config.base_url);
    info!("Database: {}", db_path.display());

    let pool = tally_common::db::init_pool(&db_path).await?;
    info!("Database connection established");

    let fetcher = SnapshotFetcher::new(&config.fetch)?;
    let collector = Arc::new(Collector::new(fetcher, pool, config));

    // Cooperative shutdown: Ctrl-C cancels the token, families exit
    // between ticks.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            signal_cancel.cancel();
        }
    });

    collector.run(cancel).await;
    info!("Collector stopped");

    Ok(())
}
