#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the property snapshot lookup.
//!
//! `lookup` runs one address through the pipeline and prints the report;
//! `serve` starts the API server. Without a subcommand the user is
//! prompted for an address.

mod render;

use std::io::Write;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dialoguer::Input;
use property_snapshot_lookup::SnapshotService;
use property_snapshot_lookup::config::Config;

#[derive(Parser)]
#[command(
    name = "property_snapshot",
    about = "Look up what we know about a property from its street address"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a single address
    Lookup {
        /// Free-text street address (e.g., "1000 E 11th St, Austin TX")
        address: String,
        /// Earliest eviction filing date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Latest eviction filing date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Start the API server
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Lookup { address, from, to }) => {
            lookup(&address, from, to, &mut std::io::stdout().lock()).await?;
        }
        Some(Commands::Serve) => {
            // The server uses actix-web's runtime, so run it in a blocking
            // task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(property_snapshot_server::run_server())
            })
            .await??;
        }
        None => {
            println!("BASTA Property Snapshot");
            println!("Type in an address and see all of the related info we have on that property");
            println!();

            let address: String = Input::new()
                .with_prompt("Address to search")
                .allow_empty(true)
                .interact_text()?;

            lookup(&address, None, None, &mut std::io::stdout().lock()).await?;
        }
    }

    Ok(())
}

async fn lookup(
    address: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    // Nothing to look up; skip loading parcels and connecting.
    if address.trim().is_empty() {
        render::render_empty_address(out)?;
        return Ok(());
    }

    let config = Config::from_env()?;

    log::info!("Loading parcels and connecting to databases...");
    let service = SnapshotService::from_config(&config).await?;

    let range = service
        .range_between(from, to)
        .ok_or("--from must not be after --to")?;

    let report = service.lookup(address, Some(range)).await?;

    render::render(&report, out)?;

    Ok(())
}
