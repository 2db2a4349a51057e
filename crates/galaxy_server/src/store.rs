//! Transactional game state storage.
//!
//! Every mutating command runs inside [`GameStore::transaction`]. The closure
//! works on a copy of the galaxy; the copy becomes the committed state only
//! when the closure returns `Ok`, so a command that fails halfway through
//! leaves nothing behind.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use galaxy_core::error::GameError;
use galaxy_core::galaxy::Galaxy;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from saving or restoring snapshots.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Snapshot file could not be read or written.
    #[error("Failed to access snapshot '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Snapshot bytes could not be encoded or decoded.
    #[error("Bad snapshot '{path}': {source}")]
    SnapshotError {
        /// Path to the file.
        path: String,
        /// Underlying engine error.
        #[source]
        source: GameError,
    },
}

/// Storage for the galaxy.
pub trait GameStore {
    /// Run `f` against the committed state.
    fn read<T>(&self, f: impl FnOnce(&Galaxy) -> T) -> T;

    /// Run `f` against a working copy and commit it if `f` succeeds.
    fn transaction<T, E>(&self, f: impl FnOnce(&mut Galaxy) -> Result<T, E>) -> Result<T, E>;
}

/// [`GameStore`] holding the galaxy in memory.
///
/// The mutex serializes transactions: two commands never interleave.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<Galaxy>,
}

impl InMemoryStore {
    /// Store starting from `galaxy`.
    #[must_use]
    pub fn new(galaxy: Galaxy) -> Self {
        Self {
            state: Mutex::new(galaxy),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Galaxy> {
        // Only whole transactions are ever written, so a poisoned lock still
        // guards a consistent galaxy.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the committed state.
    #[must_use]
    pub fn snapshot(&self) -> Galaxy {
        self.lock().clone()
    }

    /// Write the committed state to `path`.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = self
            .lock()
            .to_snapshot()
            .map_err(|e| StoreError::SnapshotError {
                path: path.display().to_string(),
                source: e,
            })?;
        fs::write(path, &bytes).map_err(|e| StoreError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        info!(path = %path.display(), bytes = bytes.len(), "Snapshot saved");
        Ok(())
    }

    /// Restore a store from a snapshot written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let bytes = fs::read(path).map_err(|e| StoreError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        let galaxy = Galaxy::from_snapshot(&bytes).map_err(|e| StoreError::SnapshotError {
            path: path.display().to_string(),
            source: e,
        })?;
        info!(
            path = %path.display(),
            planets = galaxy.planets().count(),
            "Snapshot restored"
        );
        Ok(Self::new(galaxy))
    }
}

impl GameStore for InMemoryStore {
    fn read<T>(&self, f: impl FnOnce(&Galaxy) -> T) -> T {
        f(&self.lock())
    }

    fn transaction<T, E>(&self, f: impl FnOnce(&mut Galaxy) -> Result<T, E>) -> Result<T, E> {
        let mut committed = self.lock();
        let mut working = committed.clone();
        let result = f(&mut working);
        if result.is_ok() {
            *committed = working;
        } else {
            debug!("Transaction rolled back");
        }
        result
    }
}
