//! Applies the bundled schema and prints the resulting table structures.

use property_info_api::config::Config;
use property_info_api::db::Database;

const TABLES: [&str; 2] = ["properties", "property_fetch_jobs"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url, config.database_require_ssl).await?;
    db.ensure_schema().await?;

    for table in TABLES {
        println!("- {}", table);

        let columns: Vec<(String, String)> = sqlx::query_as(
            "SELECT column_name, data_type FROM information_schema.columns WHERE table_name = $1 ORDER BY ordinal_position"
        )
        .bind(table)
        .fetch_all(&db.pool)
        .await?;

        for (col, type_) in columns {
            println!("  - {}: {}", col, type_);
        }
        println!();
    }

    Ok(())
}
