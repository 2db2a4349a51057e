//! # Galaxy Core
//!
//! Deterministic simulation core for a persistent space-empire game.
//!
//! This crate contains **only** game rules:
//! - No IO (the catalog is parsed from a string, snapshots are bytes)
//! - No wall clock (time is an explicit [`clock::Timestamp`])
//! - No system randomness (dice are injected through [`dice::Dice`])
//! - No floating-point math (uses fixed-point)
//!
//! State is only ever caught up on demand: a planet is advanced to "now" when
//! somebody looks at it, so the simulation has no tick loop of its own.
//!
//! ## Crate Structure
//!
//! - [`catalog`] - Per-type, per-level balance numbers
//! - [`planet`] - Planets, settlements and their building grids
//! - [`buildings`] - Building kinds and the shared construction lifecycle
//! - [`gathering`], [`training`], [`movement`] - What each building does
//! - [`units`] - Attack units and their combat passives
//! - [`combat`] - Attack sessions and round resolution
//! - [`galaxy`] - The aggregate every command goes through

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod buildings;
pub mod catalog;
pub mod clock;
pub mod combat;
pub mod components;
pub mod data;
pub mod dice;
pub mod error;
pub mod events;
pub mod galaxy;
pub mod gathering;
pub mod math;
pub mod movement;
pub mod planet;
pub mod training;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::buildings::{Building, BuildingKind, BuildingStatus};
    pub use crate::catalog::PropertyCatalog;
    pub use crate::clock::{Clock, Timestamp};
    pub use crate::combat::{Attack, AutoSelect, BattleOutcome, RoundOptions, RoundReport, Spoils};
    pub use crate::components::*;
    pub use crate::dice::{Dice, RngDice, SequenceDice};
    pub use crate::error::{ErrorKind, GameError, Result};
    pub use crate::events::SimEvent;
    pub use crate::galaxy::{Galaxy, GalaxyRules};
    pub use crate::math::{Coordinates, Fixed, Seconds};
    pub use crate::movement::{PlanetLink, Spaceship};
    pub use crate::planet::{Planet, Settlement};
    pub use crate::training::{Barrack, DisabledUnits};
    pub use crate::units::{AttackUnit, PerUnitKind, UnitKind};
}
