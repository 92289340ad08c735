//! DSE market data daemon: scheduler plus HTTP read API.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dse_api::config::{AppConfig, IN_MEMORY_DB};
use dse_api::{AppState, server};
use dse_core::{ArchiveStore, CacheStore, FreshnessPolicy, MarketFetcher, Result};
use dse_dsebd::DsebdFetcher;
use dse_service::{ArchiveReconciler, Scheduler, SnapshotService};
use dse_store::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!(?config, "Starting");

    let store = Arc::new(if config.db_path == IN_MEMORY_DB {
        SqliteStore::in_memory()?
    } else {
        SqliteStore::new(&config.db_path)?
    });
    let fetcher: Arc<dyn MarketFetcher> = Arc::new(DsebdFetcher::new());

    let snapshots = Arc::new(SnapshotService::new(
        Arc::clone(&fetcher),
        Arc::clone(&store) as Arc<dyn CacheStore>,
        FreshnessPolicy::new(config.cache_ttl),
    ));
    let reconciler = Arc::new(ArchiveReconciler::new(
        fetcher,
        Arc::clone(&store) as Arc<dyn ArchiveStore>,
    ));

    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&snapshots),
        Arc::clone(&reconciler),
        config.scheduler(),
    ));
    let (refresh_task, archive_task) = scheduler.spawn();

    let state = AppState {
        snapshots,
        reconciler,
        exchange_tz: config.exchange_tz,
    };
    let result = server::serve(config.bind_addr, state).await;

    refresh_task.abort();
    archive_task.abort();
    result
}
