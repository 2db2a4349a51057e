//! Spaceships, spaceports, warpers and planet links.
//!
//! A spaceship belongs to the spaceport that commissioned it. It carries
//! resources and attack units between planets; a leg's duration depends on
//! the distance, the ship's speed at the spaceport's level, and whether a
//! warp link connects the two planets. Moving ships between planets is the
//! galaxy's job since it needs both ends; this module holds the per-ship
//! state machine and the arithmetic.

use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingStatus, Facility, UpdateContext};
use crate::catalog::{attr, PropertyCatalog};
use crate::components::{BuildingId, LinkId, PlanetId, ResourceKind, ShipId, Stockpile};
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed, Seconds};
use crate::units::{AttackUnit, PerUnitKind, UnitHome, UnitKind};

/// Materials debited from the requesting planet to open a warp link.
pub const WARP_LINK_COST: u64 = 2000;
/// Speed multiplier a warp link gains per warper level.
pub const WARP_SPEED_PER_LEVEL: u32 = 3;
/// Upper bound on arrival/return legs processed in one update.
pub const MAX_LEGS_PER_UPDATE: usize = 16;

// ============================================================================
// Capacities and travel time
// ============================================================================

/// Spaceship numbers at a spaceport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipCapacity {
    /// Travel speed factor.
    pub speed: Fixed,
    /// Total unit size the ship can carry.
    pub unit_capacity: u32,
    /// Rations plus materials the ship can carry.
    pub resource_capacity: u64,
}

impl ShipCapacity {
    /// Look up the capacities for a spaceport level.
    pub fn at_level(spaceport_level: u32, catalog: &PropertyCatalog) -> Result<Self> {
        Ok(Self {
            speed: catalog.spaceship(spaceport_level, attr::TRAVEL_SPEED_FACTOR)?,
            unit_capacity: catalog
                .spaceship(spaceport_level, attr::UNIT_CAPACITY)?
                .saturating_to_num(),
            resource_capacity: catalog
                .spaceship(spaceport_level, attr::RESOURCE_CAPACITY)?
                .saturating_to_num(),
        })
    }
}

/// Seconds to cover `distance` at `ship_speed` along a route with
/// `link_factor` (1 when no warp link exists).
///
/// # Errors
///
/// [`GameError::CatalogInvalid`] when the combined speed is not positive.
pub fn travel_time(distance: Fixed, ship_speed: Fixed, link_factor: Fixed) -> Result<Seconds> {
    let speed = ship_speed.saturating_mul(link_factor);
    if speed <= Fixed::ZERO {
        return Err(GameError::CatalogInvalid(format!(
            "non-positive travel speed {ship_speed} x {link_factor}"
        )));
    }
    Ok(distance.checked_div(speed).unwrap_or(Fixed::MAX))
}

// ============================================================================
// Spaceship
// ============================================================================

/// What a spaceship carries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cargo {
    /// Rations aboard.
    pub rations: u64,
    /// Building materials aboard.
    pub materials: u64,
    /// Boarded units.
    pub units: Vec<AttackUnit>,
}

impl Cargo {
    /// Rations plus materials.
    #[must_use]
    pub const fn resources(&self) -> u64 {
        self.rations.saturating_add(self.materials)
    }

    /// Total size of the boarded units.
    pub fn unit_space(&self, catalog: &PropertyCatalog) -> Result<u32> {
        self.units
            .iter()
            .try_fold(0u32, |total, unit| Ok(total.saturating_add(unit.size(catalog)?)))
    }

    /// Whether nothing is aboard.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rations == 0 && self.materials == 0 && self.units.is_empty()
    }

    /// Boarded units counted by type.
    #[must_use]
    pub fn unit_counts(&self) -> PerUnitKind<u32> {
        let mut counts = PerUnitKind::splat(0u32);
        for unit in &self.units {
            *counts.get_mut(unit.kind()) += 1;
        }
        counts
    }
}

/// Result of advancing a ship along its current leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// Not moving.
    Docked,
    /// Still travelling.
    InTransit,
    /// Reached `destination` with `leftover` seconds of the step unused.
    Arrived {
        /// Planet reached.
        destination: PlanetId,
        /// Unused part of the elapsed time.
        leftover: Seconds,
    },
}

/// A cargo and troop transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spaceship {
    /// Unique id.
    pub id: ShipId,
    /// What is aboard.
    pub cargo: Cargo,
    /// Where the ship is heading; `None` while docked.
    pub destination: Option<PlanetId>,
    /// Seconds left on the current leg.
    #[serde(with = "fixed_serde")]
    pub moving_time_left: Seconds,
    /// Full duration of the current leg.
    #[serde(with = "fixed_serde")]
    pub leg_time: Seconds,
}

impl Spaceship {
    /// A docked, empty ship.
    #[must_use]
    pub fn new(id: ShipId) -> Self {
        Self {
            id,
            cargo: Cargo::default(),
            destination: None,
            moving_time_left: Fixed::ZERO,
            leg_time: Fixed::ZERO,
        }
    }

    /// Whether the ship is travelling.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.moving_time_left > Fixed::ZERO
    }

    /// Fail with [`GameError::ShipMoving`] unless docked.
    pub fn ensure_docked(&self) -> Result<()> {
        if self.is_moving() {
            return Err(GameError::ShipMoving(self.id));
        }
        Ok(())
    }

    /// Move `amount` of a resource from `stockpile` aboard.
    ///
    /// # Errors
    ///
    /// Fails without changes while moving, when the combined resource
    /// capacity would be exceeded, or when the planet cannot pay.
    pub fn board_resource(
        &mut self,
        resource: ResourceKind,
        amount: u64,
        capacity: &ShipCapacity,
        stockpile: &mut Stockpile,
    ) -> Result<()> {
        self.ensure_docked()?;
        let used = self.cargo.resources();
        if used.saturating_add(amount) > capacity.resource_capacity {
            return Err(GameError::ShipCapacityExceeded {
                used,
                requested: amount,
                capacity: capacity.resource_capacity,
            });
        }
        stockpile.spend(resource, amount)?;
        match resource {
            ResourceKind::Rations => self.cargo.rations += amount,
            ResourceKind::Materials => self.cargo.materials += amount,
        }
        Ok(())
    }

    /// Check that `unit` may board: docked, trained, and within the unit
    /// capacity.
    pub fn check_boarding(
        &self,
        unit: &AttackUnit,
        capacity: &ShipCapacity,
        catalog: &PropertyCatalog,
    ) -> Result<()> {
        self.ensure_docked()?;
        if unit.is_training() {
            return Err(GameError::UnitUnavailable(unit.id));
        }
        let used = self.cargo.unit_space(catalog)?;
        let size = unit.size(catalog)?;
        if used.saturating_add(size) > capacity.unit_capacity {
            return Err(GameError::ShipCapacityExceeded {
                used: u64::from(used),
                requested: u64::from(size),
                capacity: u64::from(capacity.unit_capacity),
            });
        }
        Ok(())
    }

    /// Put a unit aboard. Call [`check_boarding`](Self::check_boarding) first.
    pub fn load_unit(&mut self, mut unit: AttackUnit) {
        unit.home = UnitHome::Spaceship(self.id);
        self.cargo.units.push(unit);
    }

    /// Start a leg towards `destination` lasting `time` seconds.
    ///
    /// A leg always takes at least one fixed-point tick so that a moving
    /// ship is distinguishable from a docked one.
    pub fn depart(&mut self, destination: PlanetId, time: Seconds) {
        let time = time.max(Fixed::DELTA);
        self.destination = Some(destination);
        self.moving_time_left = time;
        self.leg_time = time;
        tracing::debug!(ship = %self.id, %destination, seconds = %time, "Ship departed");
    }

    /// Advance the current leg by `elapsed` seconds.
    pub fn advance_leg(&mut self, elapsed: Seconds) -> Leg {
        let Some(destination) = self.destination else {
            return Leg::Docked;
        };
        if elapsed < self.moving_time_left {
            self.moving_time_left -= elapsed;
            return Leg::InTransit;
        }
        let leftover = elapsed - self.moving_time_left;
        self.moving_time_left = Fixed::ZERO;
        self.leg_time = Fixed::ZERO;
        self.destination = None;
        Leg::Arrived {
            destination,
            leftover,
        }
    }

    /// Seconds until the ship is docked at `home` again.
    #[must_use]
    pub fn return_time(&self, home: PlanetId) -> Seconds {
        match self.destination {
            None => Fixed::ZERO,
            Some(destination) if destination == home => self.moving_time_left,
            // The way back is the same route
            Some(_) => self.moving_time_left.saturating_add(self.leg_time),
        }
    }

    /// Take everything aboard, leaving the hold empty.
    pub fn take_cargo(&mut self) -> Cargo {
        std::mem::take(&mut self.cargo)
    }

    /// Human-readable cargo summary.
    #[must_use]
    pub fn description(&self) -> String {
        if self.cargo.is_empty() {
            return String::from("empty");
        }
        let mut parts = Vec::new();
        if self.cargo.rations > 0 {
            parts.push(format!("{} {}", self.cargo.rations, ResourceKind::Rations));
        }
        if self.cargo.materials > 0 {
            parts.push(format!("{} {}", self.cargo.materials, ResourceKind::Materials));
        }
        if !self.cargo.units.is_empty() {
            let counts = self.cargo.unit_counts();
            let kinds: Vec<String> = UnitKind::ALL
                .iter()
                .map(|kind| (*counts.get(*kind), kind))
                .filter(|(count, _)| *count > 0)
                .map(|(count, kind)| format!("{count} {kind}"))
                .collect();
            let units = format!("{} units ({})", self.cargo.units.len(), kinds.join(", "));
            parts.push(units);
        }
        parts.join(", ")
    }
}

// ============================================================================
// Spaceport and warper roles
// ============================================================================

/// Spaceport role: owns exactly one ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spaceport {
    /// The docked (or travelling) ship.
    pub ship: Spaceship,
}

impl Spaceport {
    /// A spaceport with a freshly commissioned ship.
    #[must_use]
    pub fn new(ship: ShipId) -> Self {
        Self {
            ship: Spaceship::new(ship),
        }
    }
}

impl Facility for Spaceport {
    // Legs involve two planets and are advanced by the galaxy.
    fn advance(&mut self, _: BuildingStatus, _: Seconds, _: &mut UpdateContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Warper role: anchors at most one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Warper {
    /// The link this warper powers.
    pub link: Option<LinkId>,
}

impl Warper {
    /// Travel-speed multiplier for a link powered at `level`.
    #[must_use]
    pub fn speed_factor(level: u32) -> Fixed {
        Fixed::from_num(WARP_SPEED_PER_LEVEL.saturating_mul(level))
    }
}

impl Facility for Warper {
    fn advance(&mut self, _: BuildingStatus, _: Seconds, _: &mut UpdateContext<'_>) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Planet links
// ============================================================================

/// Accelerated route between two planets, powered by one warper.
///
/// Stored with a direction but used in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetLink {
    /// Unique id.
    pub id: LinkId,
    /// Planet that requested the link and owns the warper.
    pub from: PlanetId,
    /// Linked planet.
    pub to: PlanetId,
    /// Warper powering the link.
    pub warper: BuildingId,
}

impl PlanetLink {
    /// Whether this link joins `a` and `b`, in either direction.
    #[must_use]
    pub fn connects(&self, a: PlanetId, b: PlanetId) -> bool {
        self.pair_key() == pair_key(a, b)
    }

    /// The end opposite `planet`, if `planet` is an end at all.
    #[must_use]
    pub fn other_end(&self, planet: PlanetId) -> Option<PlanetId> {
        if planet == self.from {
            Some(self.to)
        } else if planet == self.to {
            Some(self.from)
        } else {
            None
        }
    }

    /// Order-independent key of the linked pair.
    #[must_use]
    pub fn pair_key(&self) -> (PlanetId, PlanetId) {
        pair_key(self.from, self.to)
    }
}

/// Order-independent key of a planet pair.
#[must_use]
pub fn pair_key(a: PlanetId, b: PlanetId) -> (PlanetId, PlanetId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
