#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the charging station pipeline.
//!
//! Uses `indicatif-log-bridge` (via [`ev_map_cli_utils::init_logger`]) to
//! route `log` output through `indicatif::MultiProgress` so that log lines
//! and progress bars never fight for the terminal.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use ev_map_cli_utils::IndicatifProgress;
use ev_map_database::output_db;
use ev_map_pipeline::{Pipeline, PipelineConfig, fetch_resolver};
use ev_map_region::Coordinate;

#[derive(Parser)]
#[command(name = "ev_map", about = "EV charging station aggregation pipeline")]
struct Cli {
    /// Config file (defaults to `EV_MAP_CONFIG`, then the built-in config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all sources and rebuild the output database
    Run {
        /// Output database path (overrides config and `EV_MAP_DATABASE`)
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// List configured sources
    Sources,
    /// Resolve a single coordinate against the boundary source
    Resolve {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Print the persisted output table
    Show {
        /// Output database path (overrides config and `EV_MAP_DATABASE`)
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = ev_map_cli_utils::init_logger();
    let cli = Cli::parse();
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run { database: None }) {
        Commands::Run { database } => {
            if let Some(database) = database {
                config.output.database = Some(database);
            }
            let db_path = config.output.database_path();

            let start = Instant::now();
            let fetch_progress = IndicatifProgress::steps_bar(&multi, "Fetching sources", 3);
            let progress = IndicatifProgress::records_bar(&multi, "Resolving stations");
            let mut pipeline = Pipeline::from_config(config)?
                .with_fetch_progress(fetch_progress)
                .with_progress(progress);
            let report = pipeline.run().await?;

            log::info!(
                "Wrote {} rows to {} in {:.1}s (attempts: {}, stations: {}/{} normalized, \
                 {} unresolved, {} swapped-axis matches)",
                report.rows_written,
                db_path.display(),
                start.elapsed().as_secs_f64(),
                report.attempts,
                report.normalized_stations,
                report.raw_stations,
                report.unresolved,
                report.swapped_axis_matches
            );
        }
        Commands::Sources => {
            println!("{:<12} {:<20} {:<30} LOCATION", "ROLE", "ID", "NAME");
            println!("{}", "-".repeat(90));
            for (kind, source) in config.sources() {
                println!(
                    "{:<12} {:<20} {:<30} {}",
                    kind.as_ref(),
                    source.id(),
                    source.name(),
                    source.location
                );
            }
        }
        Commands::Resolve { lat, lng } => {
            let coord = Coordinate::new(lat, lng).ok_or("Coordinates must be finite numbers")?;
            let client = ev_map_source::build_http_client()?;
            let resolver = fetch_resolver(&config, &client).await?;

            match resolver.resolve_with_order(coord) {
                Some(resolution) => {
                    println!("{} (matched as {})", resolution.name, resolution.order);
                }
                None => println!("unresolved"),
            }
        }
        Commands::Show { database } => {
            let path = database.unwrap_or_else(|| config.output.database_path());
            let conn = output_db::open(&path)?;
            let rows = output_db::read_aggregate(&conn)?;

            if let Some(last_run) = output_db::get_meta(&conn, "last_run_at")? {
                println!("Last run: {last_run}");
            }
            println!("{:<30} {:>10} {:>12}", "STATE", "STATIONS", "VEHICLES");
            println!("{}", "-".repeat(54));
            for row in &rows {
                println!(
                    "{:<30} {:>10} {:>12}",
                    row.region_name, row.station_count, row.vehicle_count
                );
            }
            println!("{} row(s)", rows.len());
        }
    }

    Ok(())
}
