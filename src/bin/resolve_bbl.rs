//! Resolves one street address to its BBL and portal link.
//!
//! The address is taken from the command line, or prompted for when absent:
//!
//! ```text
//! resolve_bbl 123 Broadway Manhattan
//! resolve_bbl --zip 123 Broadway 10001
//! ```

use clap::Parser;
use property_info_api::config::GeoclientConfig;
use property_info_api::geoclient::{parcel_link, split_address, GeoclientService, LocalityKind};
use std::io::{self, BufRead, Write};

#[derive(Debug, Parser)]
#[command(about = "Look up the NYC BBL for a street address")]
struct Args {
    /// Treat the last token as a ZIP code instead of a borough name.
    #[arg(long)]
    zip: bool,

    /// Address as "<house number> <street> <borough|zip>".
    address: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let kind = if args.zip {
        LocalityKind::Zip
    } else {
        LocalityKind::Borough
    };

    let input = if args.address.is_empty() {
        prompt(kind)?
    } else {
        args.address.join(" ")
    };

    let geoclient = GeoclientService::new(&GeoclientConfig::from_env()?)?;

    let bbl = match split_address(&input, kind) {
        Some(parts) => geoclient.resolve_parts(&parts).await,
        None => {
            println!(
                "Please enter address in the format: house_number street_name {}",
                kind
            );
            None
        }
    };

    println!("BBL: {}", bbl.as_deref().unwrap_or("None"));
    if let Some(bbl) = bbl {
        println!("{}", parcel_link(&bbl));
    }

    Ok(())
}

fn prompt(kind: LocalityKind) -> anyhow::Result<String> {
    let example = match kind {
        LocalityKind::Borough => "123 Broadway Manhattan",
        LocalityKind::Zip => "123 Broadway 10001",
    };
    print!("Enter address (e.g., '{}'): ", example);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
