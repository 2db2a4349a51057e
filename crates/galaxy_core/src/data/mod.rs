//! Data structures for the property catalog file.
//!
//! This module contains pure data structures designed to be deserialized
//! from RON. Conversion into the lookup structure used by the engine lives in
//! [`crate::catalog`].
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `galaxy_server` and `galaxy_tools`.

mod catalog_data;

pub use catalog_data::{CatalogData, TypeData};
