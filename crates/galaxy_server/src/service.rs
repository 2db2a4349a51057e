//! Command service.
//!
//! [`GameService`] is the request layer over the core: one method per player
//! command. Each call runs in a single store transaction that first catches
//! the planets it touches up to the current time, then runs the command.

use std::sync::{Mutex, PoisonError};

use galaxy_core::buildings::BuildingKind;
use galaxy_core::catalog::PropertyCatalog;
use galaxy_core::clock::{Clock, Timestamp};
use galaxy_core::combat::{RoundOptions, RoundReport, Spoils};
use galaxy_core::components::{
    AttackId, BuildingId, GridPos, LinkId, OwnerId, PlanetId, SettlementId, UnitId,
};
use galaxy_core::dice::RngDice;
use galaxy_core::error::Result;
use galaxy_core::events::SimEvent;
use galaxy_core::galaxy::Galaxy;
use galaxy_core::math::{Coordinates, Seconds};
use galaxy_core::planet::Planet;
use galaxy_core::training::DisabledUnits;
use galaxy_core::units::UnitKind;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::store::GameStore;

fn log_events(planet: PlanetId, events: &[SimEvent]) {
    for event in events {
        debug!(%planet, ?event, "Simulation event");
    }
}

/// Game commands over a store and a clock.
#[derive(Debug)]
pub struct GameService<S, C> {
    store: S,
    clock: C,
    catalog: PropertyCatalog,
    dice: Mutex<RngDice<StdRng>>,
}

impl<S: GameStore, C: Clock> GameService<S, C> {
    /// Service over `store`. Rolls are seeded from `seed`, or from entropy
    /// when `None`.
    pub fn new(store: S, clock: C, catalog: PropertyCatalog, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            store,
            clock,
            catalog,
            dice: Mutex::new(RngDice(rng)),
        }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The balance catalog in use.
    pub const fn catalog(&self) -> &PropertyCatalog {
        &self.catalog
    }

    fn advance(&self, galaxy: &mut Galaxy, planets: &[PlanetId], now: Timestamp) -> Result<()> {
        for &planet in planets {
            let events = galaxy.advance_planet(planet, now, &self.catalog)?;
            log_events(planet, &events);
        }
        Ok(())
    }

    /// Run `f` after catching `touched` up to now.
    fn command<T>(
        &self,
        touched: &[PlanetId],
        f: impl FnOnce(&mut Galaxy, &PropertyCatalog) -> Result<T>,
    ) -> Result<T> {
        let now = self.clock.now();
        self.store.transaction(|galaxy| {
            self.advance(galaxy, touched, now)?;
            f(galaxy, &self.catalog)
        })
    }

    /// Run `f` after catching both sides of `attack` up to now.
    fn attack_command<T>(
        &self,
        attack: AttackId,
        f: impl FnOnce(&mut Galaxy, &PropertyCatalog) -> Result<T>,
    ) -> Result<T> {
        let now = self.clock.now();
        self.store.transaction(|galaxy| {
            let session = galaxy.attack_session(attack)?;
            let pair = [session.attacker, session.defender];
            self.advance(galaxy, &pair, now)?;
            f(galaxy, &self.catalog)
        })
    }

    // ========================================================================
    // Planets
    // ========================================================================

    /// Give `owner` a new planet.
    pub fn colonize(&self, owner: OwnerId, name: &str) -> Result<PlanetId> {
        let now = self.clock.now();
        let planet = self.store.transaction(|galaxy| {
            let mut dice = self.dice.lock().unwrap_or_else(PoisonError::into_inner);
            galaxy.colonize(owner, name, &self.catalog, &mut *dice, now)
        })?;
        info!(%owner, %planet, planet_name = name, "Planet colonized");
        Ok(planet)
    }

    /// The planet as of now.
    pub fn planet(&self, planet: PlanetId) -> Result<Planet> {
        self.command(&[planet], |galaxy, _| galaxy.planet(planet).cloned())
    }

    /// Catch every planet of `owner` up to now.
    pub fn catch_up(&self, owner: OwnerId) -> Result<Vec<SimEvent>> {
        let now = self.clock.now();
        self.store
            .transaction(|galaxy| galaxy.advance_owner(owner, now, &self.catalog))
    }

    /// Found another settlement.
    pub fn found_settlement(&self, planet: PlanetId) -> Result<SettlementId> {
        self.command(&[planet], |galaxy, _| galaxy.found_settlement(planet))
    }

    /// Remove a settlement with everything on it.
    pub fn remove_settlement(&self, planet: PlanetId, settlement: SettlementId) -> Result<()> {
        self.command(&[planet], |galaxy, _| galaxy.remove_settlement(planet, settlement))
    }

    // ========================================================================
    // Buildings
    // ========================================================================

    /// Place a new building.
    pub fn build(
        &self,
        planet: PlanetId,
        settlement: SettlementId,
        kind: BuildingKind,
        position: GridPos,
    ) -> Result<BuildingId> {
        self.command(&[planet], |galaxy, catalog| {
            galaxy.build(planet, settlement, kind, position, catalog)
        })
    }

    /// Demolish a building.
    pub fn remove_building(&self, planet: PlanetId, building: BuildingId) -> Result<()> {
        self.command(&[planet], |galaxy, _| galaxy.remove_building(planet, building))
    }

    /// Start upgrading a building; returns the target level.
    pub fn upgrade_building(&self, planet: PlanetId, building: BuildingId) -> Result<u32> {
        self.command(&[planet], |galaxy, catalog| {
            galaxy.upgrade_building(planet, building, catalog)
        })
    }

    /// Start a farm or mine cycle.
    pub fn start_gathering(&self, planet: PlanetId, building: BuildingId) -> Result<()> {
        self.command(&[planet], |galaxy, catalog| {
            galaxy.start_gathering(planet, building, catalog)
        })
    }

    /// Move a farm or mine's store into the stockpile.
    pub fn collect_resources(&self, planet: PlanetId, building: BuildingId) -> Result<u64> {
        self.command(&[planet], |galaxy, _| galaxy.collect_resources(planet, building))
    }

    // ========================================================================
    // Barracks
    // ========================================================================

    /// Queue a unit for training.
    pub fn train_unit(
        &self,
        planet: PlanetId,
        barrack: BuildingId,
        kind: UnitKind,
        level: u32,
    ) -> Result<UnitId> {
        self.command(&[planet], |galaxy, catalog| {
            galaxy.train_unit(planet, barrack, kind, level, catalog)
        })
    }

    /// Raise a barrack's level for one unit type.
    pub fn upgrade_unit_type(
        &self,
        planet: PlanetId,
        barrack: BuildingId,
        kind: UnitKind,
    ) -> Result<u32> {
        self.command(&[planet], |galaxy, catalog| {
            galaxy.upgrade_unit_type(planet, barrack, kind, catalog)
        })
    }

    /// Which unit types cannot be trained right now.
    pub fn disabled_units(&self, planet: PlanetId, barrack: BuildingId) -> Result<DisabledUnits> {
        self.command(&[planet], |galaxy, catalog| {
            galaxy.disabled_units(planet, barrack, catalog)
        })
    }

    // ========================================================================
    // Combat
    // ========================================================================

    /// Open an attack.
    pub fn attack(&self, attacker: PlanetId, defender: PlanetId) -> Result<AttackId> {
        self.command(&[attacker, defender], |galaxy, _| galaxy.attack(attacker, defender))
    }

    /// Choose the attacker's unit for the next round.
    pub fn select_attack_unit(&self, attack: AttackId, unit: UnitId) -> Result<()> {
        self.attack_command(attack, |galaxy, _| galaxy.select_attack_unit(attack, unit))
    }

    /// Choose the defender's unit for the next round.
    pub fn select_defence_unit(&self, attack: AttackId, unit: UnitId) -> Result<()> {
        self.attack_command(attack, |galaxy, _| galaxy.select_defence_unit(attack, unit))
    }

    /// Play one round.
    pub fn play_round(&self, attack: AttackId, options: RoundOptions) -> Result<RoundReport> {
        self.attack_command(attack, |galaxy, catalog| {
            let mut dice = self.dice.lock().unwrap_or_else(PoisonError::into_inner);
            galaxy.play_round(attack, options, catalog, &mut *dice)
        })
    }

    /// Settle an attack as a win.
    pub fn win(&self, attack: AttackId) -> Result<Spoils> {
        self.attack_command(attack, |galaxy, _| galaxy.win(attack))
    }

    /// Settle an attack as a loss.
    pub fn lose(&self, attack: AttackId) -> Result<Spoils> {
        self.attack_command(attack, |galaxy, _| galaxy.lose(attack))
    }

    // ========================================================================
    // Warp links
    // ========================================================================

    /// Link a warper to `target`.
    pub fn create_link(
        &self,
        planet: PlanetId,
        warper: BuildingId,
        target: PlanetId,
    ) -> Result<LinkId> {
        self.command(&[planet, target], |galaxy, _| {
            galaxy.create_link(planet, warper, target)
        })
    }

    /// Point a warper at the planet at `target`, or unlink it.
    pub fn change_warp_link(
        &self,
        planet: PlanetId,
        warper: BuildingId,
        target: Option<Coordinates>,
    ) -> Result<Option<LinkId>> {
        self.command(&[planet], |galaxy, _| {
            galaxy.change_warp_link(planet, warper, target)
        })
    }

    /// Planets a warper on `planet` could link to.
    pub fn possible_warp_targets(&self, planet: PlanetId) -> Result<Vec<PlanetId>> {
        self.store.read(|galaxy| galaxy.possible_warp_targets(planet))
    }

    // ========================================================================
    // Spaceships
    // ========================================================================

    /// Load rations onto a docked ship.
    pub fn board_rations(&self, planet: PlanetId, spaceport: BuildingId, amount: u64) -> Result<()> {
        self.command(&[planet], |galaxy, catalog| {
            galaxy.board_rations(planet, spaceport, amount, catalog)
        })
    }

    /// Load building materials onto a docked ship.
    pub fn board_materials(
        &self,
        planet: PlanetId,
        spaceport: BuildingId,
        amount: u64,
    ) -> Result<()> {
        self.command(&[planet], |galaxy, catalog| {
            galaxy.board_materials(planet, spaceport, amount, catalog)
        })
    }

    /// Move a trained unit from its barrack onto a docked ship.
    pub fn board_attack_unit(
        &self,
        planet: PlanetId,
        spaceport: BuildingId,
        unit: UnitId,
    ) -> Result<()> {
        self.command(&[planet], |galaxy, catalog| {
            galaxy.board_attack_unit(planet, spaceport, unit, catalog)
        })
    }

    /// Send a docked ship to `to`; returns the one-way travel time.
    pub fn move_from_to_planet(
        &self,
        planet: PlanetId,
        spaceport: BuildingId,
        to: PlanetId,
    ) -> Result<Seconds> {
        self.command(&[planet, to], |galaxy, catalog| {
            galaxy.move_from_to_planet(planet, spaceport, to, catalog)
        })
    }

    /// Whether `destination` has barrack room for a unit of `kind`.
    pub fn check_space_in_barracks(&self, destination: PlanetId, kind: UnitKind) -> Result<bool> {
        self.command(&[destination], |galaxy, catalog| {
            galaxy.check_space_in_barracks(destination, kind, catalog)
        })
    }

    /// Seconds until a ship is home again.
    pub fn return_time(&self, planet: PlanetId, spaceport: BuildingId) -> Result<Seconds> {
        self.command(&[planet], |galaxy, _| galaxy.return_time(planet, spaceport))
    }

    /// Human-readable cargo summary.
    pub fn ship_description(&self, planet: PlanetId, spaceport: BuildingId) -> Result<String> {
        self.command(&[planet], |galaxy, _| galaxy.ship_description(planet, spaceport))
    }
}
