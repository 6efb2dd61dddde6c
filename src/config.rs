use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GEOCLIENT_BASE_URL: &str = "https://api.nyc.gov/geoclient/v2";

/// Settings for the NYC Geoclient API, used by the resolver binaries. They
/// never touch the database, so this is separate from [`Config`].
#[derive(Debug, Clone, Deserialize)]
pub struct GeoclientConfig {
    /// Subscription key sent as `Ocp-Apim-Subscription-Key`. A missing key is
    /// not an error; the request goes out with an empty header.
    pub api_key: Option<String>,
    pub base_url: String,
}

impl GeoclientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("NYC_GEOCLIENT_APP_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("NYC_GEOCLIENT_APP_KEY not set; geocoding requests will be sent without a key");
        }

        let base_url = std::env::var("GEOCLIENT_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEOCLIENT_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            anyhow::bail!("GEOCLIENT_BASE_URL must start with http:// or https://");
        }

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub database_require_ssl: bool,
    /// Broker for fetch jobs. The queue lives in Postgres, so this is a
    /// Postgres URL and defaults to `database_url`.
    pub queue_url: String,
    pub port: u16,
    pub worker_concurrency: usize,
    pub worker_poll_interval_ms: u64,
    /// 0 disables in-flight suppression of repeat fetch jobs.
    pub fetch_dedup_ttl_secs: u64,
    /// A `running` job older than this is handed out again.
    pub job_visibility_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("DB_URL"))
            .map_err(|_| anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required"))
            .and_then(|url| validate_postgres_url("DATABASE_URL", url))?;

        let queue_url = match std::env::var("QUEUE_URL") {
            Ok(url) if !url.trim().is_empty() => validate_postgres_url("QUEUE_URL", url)?,
            _ => database_url.clone(),
        };

        let worker_concurrency: usize = env_or("WORKER_CONCURRENCY", 1)?;
        if worker_concurrency == 0 {
            anyhow::bail!("WORKER_CONCURRENCY must be at least 1");
        }

        let config = Self {
            database_url,
            database_require_ssl: env_or("DATABASE_REQUIRE_SSL", true)?,
            queue_url,
            port: env_or("PORT", 8000)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            worker_concurrency,
            worker_poll_interval_ms: env_or("WORKER_POLL_INTERVAL_MS", 1000)?,
            fetch_dedup_ttl_secs: env_or("FETCH_DEDUP_TTL_SECS", 0)?,
            job_visibility_timeout_secs: env_or("JOB_VISIBILITY_TIMEOUT_SECS", 300)?,
        };
        if config.job_visibility_timeout_secs == 0 {
            anyhow::bail!("JOB_VISIBILITY_TIMEOUT_SECS must be at least 1");
        }

        // Never log credentials; the URL prefix is enough to tell environments apart
        tracing::debug!("Database URL: {}...", url_prefix(&config.database_url));
        tracing::debug!("Server Port: {}", config.port);
        if config.fetch_dedup_ttl_secs > 0 {
            tracing::info!(
                "Fetch job dedup window: {}s",
                config.fetch_dedup_ttl_secs
            );
        }

        Ok(config)
    }

    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_interval_ms)
    }

    pub fn job_visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.job_visibility_timeout_secs)
    }
}

/// First 20 characters of `url`, cut on a char boundary.
fn url_prefix(url: &str) -> String {
    url.chars().take(20).collect()
}

fn validate_postgres_url(name: &str, url: String) -> anyhow::Result<String> {
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
        anyhow::bail!("{} must start with postgresql:// or postgres://", name);
    }
    Ok(url)
}

fn env_or<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", name, raw)),
        _ => Ok(default),
    }
}
