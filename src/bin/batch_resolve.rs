//! Fills the `acris_link` column of an address table in place.
//!
//! ```text
//! batch_resolve addresses.csv
//! ```

use clap::Parser;
use property_info_api::batch_resolver::BatchResolver;
use property_info_api::config::GeoclientConfig;
use property_info_api::geoclient::GeoclientService;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(about = "Resolve BBL portal links for every row of a CSV file")]
struct Args {
    /// CSV file with `address` and `zip_code` columns; rewritten in place.
    path: PathBuf,

    /// Pause between geocoder requests, in milliseconds.
    #[arg(long, env = "BATCH_DELAY_MS", default_value_t = 500)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let geoclient = GeoclientService::new(&GeoclientConfig::from_env()?)?;
    let resolver = BatchResolver::new(geoclient, Duration::from_millis(args.delay_ms));

    let summary = resolver.process(&args.path).await;

    println!(
        "Rows: {} | resolved: {} | not found: {} | skipped: {}",
        summary.total_rows,
        summary.resolved(),
        summary.not_found(),
        summary.skipped()
    );

    if let Some(reason) = summary.aborted {
        anyhow::bail!("batch aborted: {}", reason);
    }
    Ok(())
}
