//! Catalog validation.
//!
//! A catalog passes when it parses, every number is a finite non-negative
//! value, and every lookup the engine can make for an existing level
//! succeeds.

use std::fs;
use std::path::{Path, PathBuf};

use galaxy_core::catalog::{Category, CatalogIssue, PropertyCatalog};
use galaxy_core::error::GameError;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a catalog was rejected.
#[derive(Debug, Error)]
pub enum ValidateError {
    /// File or directory could not be read.
    #[error("Failed to read '{path}': {source}")]
    IoError {
        /// Path that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Syntax error or bad value.
    #[error("Invalid catalog '{path}': {source}")]
    InvalidCatalog {
        /// Catalog path.
        path: String,
        /// Underlying engine error.
        #[source]
        source: GameError,
    },

    /// Values the engine needs are missing.
    #[error("Catalog '{path}' is missing {} value(s)", .issues.len())]
    Incomplete {
        /// Catalog path.
        path: String,
        /// Every missing value.
        issues: Vec<CatalogIssue>,
    },
}

/// What a valid catalog contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSummary {
    /// Where it was read from.
    pub path: PathBuf,
    /// Building types defined.
    pub buildings: usize,
    /// Unit types defined.
    pub units: usize,
    /// Spaceship types defined.
    pub spaceships: usize,
}

/// Parse and check catalog text; `label` names it in errors.
pub fn validate_catalog_str(label: &str, text: &str) -> Result<PropertyCatalog, ValidateError> {
    let catalog = PropertyCatalog::from_ron_str(text).map_err(|e| ValidateError::InvalidCatalog {
        path: label.to_string(),
        source: e,
    })?;
    let issues = catalog.completeness_issues();
    if !issues.is_empty() {
        for issue in &issues {
            warn!(catalog = label, "{issue}");
        }
        return Err(ValidateError::Incomplete {
            path: label.to_string(),
            issues,
        });
    }
    Ok(catalog)
}

/// Read and check a catalog file.
pub fn load_catalog_file(path: &Path) -> Result<PropertyCatalog, ValidateError> {
    let label = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|e| ValidateError::IoError {
        path: label.clone(),
        source: e,
    })?;
    validate_catalog_str(&label, &text)
}

/// Validate one catalog file.
pub fn validate_catalog_file(path: &Path) -> Result<CatalogSummary, ValidateError> {
    let catalog = load_catalog_file(path)?;
    debug!(path = %path.display(), "Catalog valid");
    Ok(CatalogSummary {
        path: path.to_path_buf(),
        buildings: catalog.type_names(Category::Building).count(),
        units: catalog.type_names(Category::Unit).count(),
        spaceships: catalog.type_names(Category::Spaceship).count(),
    })
}

/// Validate a catalog file, or every `.ron` file in a directory.
///
/// Files are checked in name order and the first failure is returned.
pub fn validate_path(path: &Path) -> Result<Vec<CatalogSummary>, ValidateError> {
    if !path.is_dir() {
        return validate_catalog_file(path).map(|summary| vec![summary]);
    }

    let io_error = |e| ValidateError::IoError {
        path: path.display().to_string(),
        source: e,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(io_error)? {
        let file = entry.map_err(io_error)?.path();
        if file.extension().is_some_and(|ext| ext == "ron") {
            files.push(file);
        }
    }
    files.sort();
    files.iter().map(|file| validate_catalog_file(file)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = r#"(
        buildings: {
            "farm": (levels: { 1: { "build_cost": 50 } }),
        },
    )"#;

    #[test]
    fn test_builtin_catalog_text_is_valid() {
        let catalog = PropertyCatalog::builtin().unwrap();
        assert!(catalog.completeness_issues().is_empty());
    }

    #[test]
    fn test_incomplete_catalog_lists_issues() {
        match validate_catalog_str("tiny", TINY) {
            Err(ValidateError::Incomplete { path, issues }) => {
                assert_eq!(path, "tiny");
                assert!(!issues.is_empty());
            }
            other => panic!("expected incomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            validate_catalog_str("broken", "(buildings: {"),
            Err(ValidateError::InvalidCatalog { .. })
        ));
    }

    #[test]
    fn test_shipped_catalog_directory() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../galaxy_core/data");
        let summaries = validate_path(&dir).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].buildings, 6);
        assert_eq!(summaries[0].units, 3);
        assert_eq!(summaries[0].spaceships, 1);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            validate_path(Path::new("/nonexistent/catalog.ron")),
            Err(ValidateError::IoError { .. })
        ));
    }
}
