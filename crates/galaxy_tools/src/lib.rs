//! # Galaxy Development Tools
//!
//! Command-line helpers for balance designers:
//! - Catalog validation (parse, value checks, completeness)
//! - Travel time tables per spaceport level

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod travel;
pub mod validate;
