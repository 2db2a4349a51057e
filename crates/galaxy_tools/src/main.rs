//! Galaxy - Development Tools

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use galaxy_core::catalog::PropertyCatalog;
use galaxy_tools::travel::travel_table;
use galaxy_tools::validate::{load_catalog_file, validate_path, ValidateError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "galaxy-tools")]
#[command(about = "Development tools for the galaxy simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a catalog file or a directory of catalogs
    Validate {
        /// Catalog file or directory
        #[arg(default_value = "crates/galaxy_core/data")]
        path: PathBuf,
    },
    /// Print ship travel times for every spaceport level
    Travel {
        /// Distance between the two planets
        distance: u32,
        /// Level of the warper powering a link on the route
        #[arg(long)]
        warper_level: Option<u32>,
        /// Catalog to read speeds from; the builtin one if omitted
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating catalogs in: {}", path.display());
            match validate_path(&path) {
                Ok(summaries) => {
                    for s in summaries {
                        tracing::info!(
                            path = %s.path.display(),
                            buildings = s.buildings,
                            units = s.units,
                            spaceships = s.spaceships,
                            "Catalog valid"
                        );
                    }
                    ExitCode::SUCCESS
                }
                Err(ValidateError::Incomplete { path, issues }) => {
                    for issue in &issues {
                        tracing::error!("{path}: {issue}");
                    }
                    ExitCode::FAILURE
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Travel {
            distance,
            warper_level,
            catalog,
        } => {
            let loaded = match catalog {
                Some(path) => load_catalog_file(&path),
                None => PropertyCatalog::builtin().map_err(|e| ValidateError::InvalidCatalog {
                    path: "<builtin>".to_string(),
                    source: e,
                }),
            };
            let table = loaded
                .map_err(|e| e.to_string())
                .and_then(|c| travel_table(&c, distance, warper_level).map_err(|e| e.to_string()));
            match table {
                Ok(rows) => {
                    println!("{:>6}  {:>12}  {:>12}", "level", "one way (s)", "round trip (s)");
                    for row in rows {
                        println!(
                            "{:>6}  {:>12.1}  {:>12.1}",
                            row.spaceport_level, row.one_way, row.round_trip
                        );
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("{e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
