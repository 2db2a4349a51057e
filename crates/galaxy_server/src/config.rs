//! Server configuration.
//!
//! Configuration is a single RON document. Every field has a default, so an
//! empty `()` document is a valid configuration that plays with the builtin
//! catalog and an entropy-seeded RNG.

use std::fs;
use std::path::{Path, PathBuf};

use galaxy_core::catalog::PropertyCatalog;
use galaxy_core::error::GameError;
use galaxy_core::galaxy::GalaxyRules;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while loading configuration or the catalog.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// RON parsing failed.
    #[error("Failed to parse RON file '{path}': {source}")]
    ParseError {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// The catalog document held bad values.
    #[error("Invalid catalog '{path}': {source}")]
    InvalidCatalog {
        /// Path to the catalog, or `<builtin>`.
        path: String,
        /// Underlying engine error.
        #[source]
        source: GameError,
    },

    /// The catalog lacks values the engine will ask for.
    #[error("Catalog '{path}' is incomplete: {}", .issues.join("; "))]
    IncompleteCatalog {
        /// Path to the catalog, or `<builtin>`.
        path: String,
        /// One line per missing value.
        issues: Vec<String>,
    },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Catalog RON file; the builtin catalog when absent.
    pub catalog_path: Option<PathBuf>,
    /// Seed for combat and placement rolls; entropy when absent.
    pub rng_seed: Option<u64>,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Where the galaxy snapshot is restored from and saved to.
    pub snapshot_path: Option<PathBuf>,
    /// Galaxy-wide rules.
    pub rules: GalaxyRules,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            rng_seed: None,
            log_filter: "info".to_string(),
            snapshot_path: None,
            rules: GalaxyRules::default(),
        }
    }
}

impl ServerConfig {
    /// Parse configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Load configuration from a RON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_ron_str(&text).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
        debug!(path = %path.display(), "Loaded server config");
        Ok(config)
    }

    /// Load the configured catalog and reject it unless it is complete.
    pub fn load_catalog(&self) -> Result<PropertyCatalog, ConfigError> {
        let (label, parsed) = match &self.catalog_path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
                    path: path.display().to_string(),
                    source: e,
                })?;
                (path.display().to_string(), PropertyCatalog::from_ron_str(&text))
            }
            None => ("<builtin>".to_string(), PropertyCatalog::builtin()),
        };
        let catalog = parsed.map_err(|e| ConfigError::InvalidCatalog {
            path: label.clone(),
            source: e,
        })?;

        let issues = catalog.completeness_issues();
        if !issues.is_empty() {
            return Err(ConfigError::IncompleteCatalog {
                path: label,
                issues: issues.iter().map(ToString::to_string).collect(),
            });
        }
        info!(catalog = %label, "Catalog loaded");
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_core::components::Stockpile;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ServerConfig::from_ron_str("()").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.rules.starting_stockpile, Stockpile::new(800, 800));
        assert_eq!(config.rules.max_settlements, 3);
    }

    #[test]
    fn test_partial_document() {
        let config = ServerConfig::from_ron_str(
            "(rng_seed: Some(7), log_filter: \"debug\", rules: (max_settlements: 5))",
        )
        .unwrap();
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.rules.max_settlements, 5);
        assert_eq!(config.rules.starting_stockpile, Stockpile::new(800, 800));
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(ServerConfig::from_ron_str("(tick_rate: 20)").is_err());
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = ServerConfig::default().load_catalog().unwrap();
        assert!(catalog.completeness_issues().is_empty());
    }

    #[test]
    fn test_missing_catalog_file() {
        let config = ServerConfig {
            catalog_path: Some(PathBuf::from("/nonexistent/catalog.ron")),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.load_catalog(),
            Err(ConfigError::IoError { .. })
        ));
    }
}
