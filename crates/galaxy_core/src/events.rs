//! Events emitted while advancing the simulation.
//!
//! Nothing in the engine depends on them; they exist for logging, for tests
//! and for the request layer to tell a player what happened while they were
//! away.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::components::{BuildingId, PlanetId, ResourceKind, ShipId, UnitId};
use crate::units::UnitKind;

/// Something that happened during a catch-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A build or upgrade completed.
    ConstructionFinished {
        /// Building.
        building: BuildingId,
        /// Its kind.
        kind: BuildingKind,
        /// Level reached.
        level: u32,
    },
    /// A farm or mine filled up.
    GatheringFinished {
        /// Building.
        building: BuildingId,
        /// Resource gathered.
        resource: ResourceKind,
        /// Amount waiting to be collected.
        stored: u64,
    },
    /// A unit left the training queue.
    UnitTrained {
        /// Barrack.
        barrack: BuildingId,
        /// Unit.
        unit: UnitId,
        /// Unit type.
        kind: UnitKind,
    },
    /// A unit died because upkeep could not be paid.
    UnitStarved {
        /// Barrack.
        barrack: BuildingId,
        /// Unit.
        unit: UnitId,
        /// Unit type.
        kind: UnitKind,
    },
    /// A spaceship reached a foreign planet and unloaded.
    ShipArrived {
        /// Ship.
        ship: ShipId,
        /// Planet reached.
        planet: PlanetId,
        /// Units that found no barrack space and stayed aboard.
        units_kept_aboard: usize,
    },
    /// A spaceship docked back home.
    ShipReturned {
        /// Ship.
        ship: ShipId,
        /// Home planet.
        planet: PlanetId,
    },
}
