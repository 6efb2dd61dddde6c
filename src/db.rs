use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::str::FromStr;

/// Idempotent DDL for the `properties` table and the fetch-job queue.
pub const SCHEMA_SQL: &str = include_str!("../sql/schema.sql");

/// Explicitly constructed connection handle; cloned into each component.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, require_ssl: bool) -> anyhow::Result<Self> {
        let mut options = PgConnectOptions::from_str(database_url)?;
        if require_ssl {
            let mode = required_ssl_mode(options.get_ssl_mode());
            options = options.ssl_mode(mode);
        }

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies [`SCHEMA_SQL`]. Existing tables are left untouched.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        tracing::info!("Database schema verified");
        Ok(())
    }
}

/// Raises `mode` to at least `Require`. `verify-ca`/`verify-full` from the
/// URL are kept.
fn required_ssl_mode(mode: PgSslMode) -> PgSslMode {
    match mode {
        PgSslMode::Disable | PgSslMode::Allow | PgSslMode::Prefer => PgSslMode::Require,
        stronger => stronger,
    }
}
