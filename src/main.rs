use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use property_info_api::config::Config;
use property_info_api::db::Database;
use property_info_api::handlers::{self, AppState};
use property_info_api::job_queue::PgJobQueue;
use property_info_api::property_store::PgPropertyStore;

/// HTTP entry point: serves `POST /property-info` and `GET /health`.
///
/// Fetch jobs are only submitted here; run the `fetch_worker` binary to
/// process them.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "property_info_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let db = Database::new(&config.database_url, config.database_require_ssl).await?;
    tracing::info!("Database connection pool established");

    let queue_pool = if config.queue_url == config.database_url {
        db.pool.clone()
    } else {
        Database::new(&config.queue_url, config.database_require_ssl)
            .await?
            .pool
    };
    tracing::info!("Fetch job queue connected");

    let app_state = Arc::new(AppState::new(
        Arc::new(PgPropertyStore::new(db.pool.clone())),
        Arc::new(PgJobQueue::new(queue_pool)),
        Duration::from_secs(config.fetch_dedup_ttl_secs),
    ));

    let app = handlers::router(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
