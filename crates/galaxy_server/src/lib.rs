//! # Galaxy Server
//!
//! Request layer around `galaxy_core`.
//!
//! Owns everything the core refuses to touch: configuration files, the wall
//! clock, the RNG seed, and the committed game state. Commands reach the core
//! through [`service::GameService`], which runs each one as a single
//! transaction against a [`store::GameStore`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod clock;
pub mod config;
pub mod service;
pub mod store;

use galaxy_core::clock::Clock;
use galaxy_core::galaxy::Galaxy;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, ServerConfig};
use crate::service::GameService;
use crate::store::{InMemoryStore, StoreError};

/// Errors while bringing the server up.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration or catalog problem.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Snapshot could not be restored.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Load the catalog, restore the snapshot if one exists, and build the
/// service.
pub fn start<C: Clock>(
    config: &ServerConfig,
    clock: C,
) -> Result<GameService<InMemoryStore, C>, StartupError> {
    let catalog = config.load_catalog()?;
    let store = match &config.snapshot_path {
        Some(path) if path.exists() => InMemoryStore::load(path)?,
        _ => {
            info!("Starting with an empty galaxy");
            InMemoryStore::new(Galaxy::new(config.rules))
        }
    };
    Ok(GameService::new(store, clock, catalog, config.rng_seed))
}
