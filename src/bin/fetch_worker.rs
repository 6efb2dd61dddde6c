//! Property fetch worker process.
//!
//! Claims `fetch_property_data` jobs from the queue and upserts the fetched
//! rows. Several processes may run against the same queue.

use property_info_api::config::Config;
use property_info_api::db::Database;
use property_info_api::fetch_worker::PropertyFetchWorker;
use property_info_api::job_queue::PgJobQueue;
use property_info_api::models::JobStatus;
use property_info_api::property_store::PgPropertyStore;
use property_info_api::sources::SourceSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "property_info_api=debug,fetch_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = Database::new(&config.database_url, config.database_require_ssl).await?;
    let queue_pool = if config.queue_url == config.database_url {
        db.pool.clone()
    } else {
        Database::new(&config.queue_url, config.database_require_ssl)
            .await?
            .pool
    };

    let queue = PgJobQueue::new(queue_pool)
        .with_visibility_timeout(config.job_visibility_timeout());
    let pending = queue.count_with_status(JobStatus::Pending).await?;
    let running = queue.count_with_status(JobStatus::Running).await?;

    let sources = SourceSet::standard();
    tracing::info!(
        "Fetch worker starting: {} loop(s), {} source(s), poll every {}ms, {} pending / {} running job(s)",
        config.worker_concurrency,
        sources.len(),
        config.worker_poll_interval_ms,
        pending,
        running
    );

    let worker = Arc::new(PropertyFetchWorker::new(
        Arc::new(PgPropertyStore::new(db.pool.clone())),
        sources,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, finishing current jobs");
        }
        let _ = shutdown_tx.send(true);
    });

    worker
        .run(
            Arc::new(queue),
            config.worker_concurrency,
            config.worker_poll_interval(),
            shutdown_rx,
        )
        .await;

    Ok(())
}
