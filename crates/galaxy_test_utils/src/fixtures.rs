//! Test fixtures and helpers.
//!
//! Pre-built galaxies, a hand-driven clock and shortcuts for the waiting
//! that real players do between commands.

use std::sync::atomic::{AtomicU64, Ordering};

use fixed::types::I32F32;
use galaxy_core::buildings::BuildingKind;
use galaxy_core::catalog::{attr, PropertyCatalog};
use galaxy_core::clock::{Clock, Timestamp};
use galaxy_core::components::{BuildingId, GridPos, OwnerId, PlanetId, SettlementId, Stockpile, UnitId};
use galaxy_core::dice::SequenceDice;
use galaxy_core::events::SimEvent;
use galaxy_core::galaxy::{Galaxy, GalaxyRules};
use galaxy_core::math::Coordinates;
use galaxy_core::units::UnitKind;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// The balance table shipped with the engine.
///
/// # Panics
///
/// Panics if the builtin catalog does not parse.
#[must_use]
pub fn catalog() -> PropertyCatalog {
    PropertyCatalog::builtin().expect("builtin catalog must parse")
}

/// Stockpile large enough that tests never run short by accident.
pub const RICH: Stockpile = Stockpile::new(100_000, 100_000);

/// Where [`World::new`] puts the rival planet: 1000 east of home.
pub const RIVAL_POSITION: Coordinates = Coordinates::new(6000, 5000);

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    /// Clock reading `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self(AtomicU64::new(start.as_millis()))
    }

    /// Move forward by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.0.fetch_add(secs.saturating_mul(1000), Ordering::SeqCst);
    }

    /// Jump to `time`, which may be in the past.
    pub fn set(&self, time: Timestamp) {
        self.0.store(time.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.0.load(Ordering::SeqCst))
    }
}

/// Two rival planets 1000 apart, with a clock and the builtin catalog.
#[derive(Debug)]
pub struct World {
    /// All state.
    pub galaxy: Galaxy,
    /// Builtin catalog.
    pub catalog: PropertyCatalog,
    /// Time source; only [`World::wait`] moves it.
    pub clock: ManualClock,
    /// Planet of owner 1.
    pub home: PlanetId,
    /// Planet of owner 2, at [`RIVAL_POSITION`].
    pub rival: PlanetId,
}

impl World {
    /// Two planets, each starting with [`RICH`].
    ///
    /// # Panics
    ///
    /// Panics if colonization fails.
    #[must_use]
    pub fn new() -> Self {
        Self::with_stockpile(RICH)
    }

    /// Two planets, each starting with `stockpile`.
    ///
    /// # Panics
    ///
    /// Panics if colonization fails.
    #[must_use]
    pub fn with_stockpile(stockpile: Stockpile) -> Self {
        let catalog = catalog();
        let clock = ManualClock::default();
        let mut galaxy = Galaxy::new(GalaxyRules {
            starting_stockpile: stockpile,
            ..GalaxyRules::default()
        });
        let mut dice = SequenceDice::new([
            u32::try_from(RIVAL_POSITION.x).expect("positive"),
            u32::try_from(RIVAL_POSITION.y).expect("positive"),
        ]);
        let home = galaxy
            .colonize(OwnerId::new(1), "Home", &catalog, &mut dice, clock.now())
            .expect("first planet");
        let rival = galaxy
            .colonize(OwnerId::new(2), "Rival", &catalog, &mut dice, clock.now())
            .expect("second planet");
        Self {
            galaxy,
            catalog,
            clock,
            home,
            rival,
        }
    }

    /// Current time.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// First settlement of `planet`.
    ///
    /// # Panics
    ///
    /// Panics if the planet has none.
    #[must_use]
    pub fn settlement(&self, planet: PlanetId) -> SettlementId {
        self.galaxy.planet(planet).expect("planet exists").settlements[0].id
    }

    /// Let `secs` seconds pass and catch every planet up.
    ///
    /// # Panics
    ///
    /// Panics if advancing fails.
    pub fn wait(&mut self, secs: u64) -> Vec<SimEvent> {
        self.clock.advance_secs(secs);
        self.galaxy
            .advance_all(self.clock.now(), &self.catalog)
            .expect("advance succeeds")
    }

    /// Build a level-1 building and wait until it is finished.
    ///
    /// # Panics
    ///
    /// Panics if building fails.
    pub fn build_finished(&mut self, planet: PlanetId, kind: BuildingKind, position: GridPos) -> BuildingId {
        let settlement = self.settlement(planet);
        let id = self
            .galaxy
            .build(planet, settlement, kind, position, &self.catalog)
            .expect("build succeeds");
        let time = self
            .catalog
            .building_u64(kind, 1, attr::UPGRADE_TIME)
            .expect("build time in catalog");
        self.wait(time);
        id
    }

    /// Queue `count` level-1 units and wait until all are trained.
    ///
    /// # Panics
    ///
    /// Panics if the barrack rejects a unit.
    pub fn train(&mut self, planet: PlanetId, barrack: BuildingId, kind: UnitKind, count: usize) -> Vec<UnitId> {
        let ids: Vec<UnitId> = (0..count)
            .map(|_| {
                self.galaxy
                    .train_unit(planet, barrack, kind, 1, &self.catalog)
                    .expect("training accepted")
            })
            .collect();
        let per_unit = self
            .catalog
            .unit_u64(kind, 1, attr::TRAINING_TIME)
            .expect("training time in catalog");
        self.wait(per_unit * count as u64);
        ids
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(Timestamp::from_secs(5));
        clock.advance_secs(10);
        assert_eq!(clock.now(), Timestamp::from_secs(15));
        clock.set(Timestamp::ZERO);
        assert_eq!(clock.now(), Timestamp::ZERO);
    }

    #[test]
    fn test_world_layout() {
        let world = World::new();
        let rival = world.galaxy.planet(world.rival).unwrap();
        assert_eq!(rival.position, RIVAL_POSITION);
        assert_eq!(rival.stockpile, RICH);
        assert_ne!(rival.owner, world.galaxy.planet(world.home).unwrap().owner);
    }

    #[test]
    fn test_build_finished_is_operational() {
        let mut world = World::new();
        let home = world.home;
        let barrack = world.build_finished(home, BuildingKind::Barrack, GridPos::new(0, 0));
        let building = world.galaxy.planet(home).unwrap().building(barrack).unwrap();
        assert!(!building.under_construction());
    }

    #[test]
    fn test_train_waits_for_whole_queue() {
        let mut world = World::new();
        let home = world.home;
        let barrack = world.build_finished(home, BuildingKind::Barrack, GridPos::new(0, 0));
        let units = world.train(home, barrack, UnitKind::SpaceMarine, 3);
        let planet = world.galaxy.planet(home).unwrap();
        assert!(units
            .iter()
            .all(|id| !planet.find_unit(*id).unwrap().is_training()));
    }
}
