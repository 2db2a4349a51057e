//! Galaxy Server - loads configuration and game state, then reports ready.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use galaxy_core::galaxy::Galaxy;
use galaxy_server::clock::SystemClock;
use galaxy_server::config::ServerConfig;
use galaxy_server::store::GameStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "galaxy-server")]
#[command(about = "Galaxy game server")]
struct Cli {
    /// Server configuration (RON)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ServerConfig::load(path),
        None => Ok(ServerConfig::default()),
    };
    let filter = config
        .as_ref()
        .map_or_else(|_| "info".to_string(), |c| c.log_filter.clone());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Starting Galaxy Server");
    let service = match galaxy_server::start(&config, SystemClock) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let (planets, attacks) = service
        .store()
        .read(|galaxy: &Galaxy| (galaxy.planets().count(), galaxy.attacks().count()));
    tracing::info!(planets, attacks, "Server ready");
    ExitCode::SUCCESS
}
