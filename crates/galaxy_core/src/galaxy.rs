//! The galaxy: every planet, warp link and ongoing attack.
//!
//! [`Galaxy`] is the unit of persistence and the entry point for every
//! command. It keeps unique indexes for the invariants that span planets
//! (one attack per planet and role, one link per planet pair) and checks them
//! inside the same mutation that inserts, so a store that serializes
//! transactions gets the same guarantees as a unique constraint.
//!
//! Time only moves through [`Galaxy::advance_planet`] and friends: a command
//! sees a planet exactly as it was left unless the caller advanced it first.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingKind};
use crate::catalog::PropertyCatalog;
use crate::clock::Timestamp;
use crate::combat::{self, Attack, BattleOutcome, RoundOptions, RoundReport, Spoils};
use crate::components::{
    AttackId, BuildingId, GridPos, IdAllocator, LinkId, OwnerId, PlanetId, ResourceKind,
    SettlementId, Stockpile, UnitId,
};
use crate::dice::Dice;
use crate::error::{GameError, Result};
use crate::events::SimEvent;
use crate::math::{Coordinates, Fixed, Seconds};
use crate::movement::{
    self, Cargo, Leg, PlanetLink, ShipCapacity, Warper, MAX_LEGS_PER_UPDATE, WARP_LINK_COST,
};
use crate::planet::{Planet, MAX_SETTLEMENTS, TOWN_HALL_SLOT};
use crate::training::DisabledUnits;
use crate::units::{AttackUnit, UnitKind};

/// Where the first planet is placed.
pub const FIRST_PLANET_POSITION: Coordinates = Coordinates::new(5000, 5000);
/// A new planet must be further than this from some existing planet.
pub const MIN_PLANET_SPACING: u64 = 500;
/// A new planet must be closer than this to some existing planet.
pub const MAX_NEIGHBOUR_DISTANCE: u64 = 3000;
/// Coordinate samples tried before colonization gives up.
pub const PLACEMENT_ATTEMPTS: u32 = 10_000;

/// Tunables that are not per-level balance numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalaxyRules {
    /// Resources a new planet starts with.
    pub starting_stockpile: Stockpile,
    /// Settlements a planet may hold.
    pub max_settlements: usize,
}

impl Default for GalaxyRules {
    fn default() -> Self {
        Self {
            starting_stockpile: Stockpile::new(800, 800),
            max_settlements: MAX_SETTLEMENTS,
        }
    }
}

/// All game state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Galaxy {
    planets: BTreeMap<PlanetId, Planet>,
    links: BTreeMap<LinkId, PlanetLink>,
    attacks: BTreeMap<AttackId, Attack>,
    offence: BTreeMap<PlanetId, AttackId>,
    defence: BTreeMap<PlanetId, AttackId>,
    link_by_pair: BTreeMap<(PlanetId, PlanetId), LinkId>,
    ids: IdAllocator,
    rules: GalaxyRules,
}

fn planet_mut(planets: &mut BTreeMap<PlanetId, Planet>, id: PlanetId) -> Result<&mut Planet> {
    planets.get_mut(&id).ok_or(GameError::PlanetNotFound(id))
}

/// Credit resources and garrison units on `planet`; returns units that did
/// not fit.
fn unload(planet: &mut Planet, cargo: Cargo, catalog: &PropertyCatalog) -> Result<Vec<AttackUnit>> {
    planet.stockpile.credit(ResourceKind::Rations, cargo.rations);
    planet.stockpile.credit(ResourceKind::Materials, cargo.materials);
    planet.receive_units(cargo.units, catalog)
}

impl Galaxy {
    /// Empty galaxy.
    #[must_use]
    pub fn new(rules: GalaxyRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// The rules this galaxy was created with.
    #[must_use]
    pub const fn rules(&self) -> &GalaxyRules {
        &self.rules
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Look up a planet.
    pub fn planet(&self, id: PlanetId) -> Result<&Planet> {
        self.planets.get(&id).ok_or(GameError::PlanetNotFound(id))
    }

    /// Every planet, by id.
    pub fn planets(&self) -> impl Iterator<Item = &Planet> {
        self.planets.values()
    }

    /// Planets owned by `owner`.
    pub fn planets_of(&self, owner: OwnerId) -> impl Iterator<Item = &Planet> {
        self.planets.values().filter(move |p| p.owner == owner)
    }

    /// Planet at exact coordinates.
    pub fn planet_at(&self, position: Coordinates) -> Result<PlanetId> {
        self.planets
            .values()
            .find(|p| p.position == position)
            .map(|p| p.id)
            .ok_or(GameError::NoPlanetAt {
                x: position.x,
                y: position.y,
            })
    }

    /// Look up an attack.
    pub fn attack_session(&self, id: AttackId) -> Result<&Attack> {
        self.attacks.get(&id).ok_or(GameError::AttackNotFound(id))
    }

    /// Every ongoing attack.
    pub fn attacks(&self) -> impl Iterator<Item = &Attack> {
        self.attacks.values()
    }

    /// Attack `planet` is currently waging, if any.
    #[must_use]
    pub fn attack_by(&self, planet: PlanetId) -> Option<AttackId> {
        self.offence.get(&planet).copied()
    }

    /// Attack `planet` is currently defending against, if any.
    #[must_use]
    pub fn attack_on(&self, planet: PlanetId) -> Option<AttackId> {
        self.defence.get(&planet).copied()
    }

    /// Look up a link.
    pub fn link(&self, id: LinkId) -> Result<&PlanetLink> {
        self.links.get(&id).ok_or(GameError::LinkNotFound(id))
    }

    /// Every warp link.
    pub fn links(&self) -> impl Iterator<Item = &PlanetLink> {
        self.links.values()
    }

    /// Link joining two planets, in either direction.
    #[must_use]
    pub fn link_between(&self, a: PlanetId, b: PlanetId) -> Option<&PlanetLink> {
        self.link_by_pair
            .get(&movement::pair_key(a, b))
            .and_then(|id| self.links.get(id))
    }

    // ========================================================================
    // Colonization
    // ========================================================================

    /// Create a planet for `owner` with the starting stockpile, one
    /// settlement and a town hall.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] when no position satisfying the spacing
    /// rules was found.
    pub fn colonize(
        &mut self,
        owner: OwnerId,
        name: impl Into<String>,
        catalog: &PropertyCatalog,
        dice: &mut dyn Dice,
        now: Timestamp,
    ) -> Result<PlanetId> {
        let position = self.place_planet(dice)?;
        let id = self.ids.next();
        let mut planet = Planet::new(id, owner, name, position, self.rules.starting_stockpile, now);
        let settlement = planet.found_settlement(self.rules.max_settlements, &mut self.ids)?;
        planet.build(settlement, BuildingKind::TownHall, TOWN_HALL_SLOT, catalog, &mut self.ids)?;

        tracing::info!(planet = %id, %owner, %position, "Planet colonized");
        self.planets.insert(id, planet);
        Ok(id)
    }

    fn place_planet(&self, dice: &mut dyn Dice) -> Result<Coordinates> {
        if self.planets.is_empty() {
            return Ok(FIRST_PLANET_POSITION);
        }
        let (max_x, max_y) = self.planets.values().fold((0i32, 0i32), |(x, y), p| {
            (x.max(p.position.x), y.max(p.position.y))
        });
        let bound = |v: i32| u32::try_from(i64::from(v) * 3 / 2).unwrap_or(u32::MAX >> 1);
        let (bound_x, bound_y) = (bound(max_x), bound(max_y));

        for _ in 0..PLACEMENT_ATTEMPTS {
            let x = i32::try_from(dice.roll(bound_x)).unwrap_or(i32::MAX);
            let y = i32::try_from(dice.roll(bound_y)).unwrap_or(i32::MAX);
            let candidate = Coordinates::new(x, y);

            let mut far_enough = false;
            let mut close_enough = false;
            for planet in self.planets.values() {
                let d2 = planet.position.distance_squared(candidate);
                far_enough |= d2 > MIN_PLANET_SPACING * MIN_PLANET_SPACING;
                close_enough |= d2 < MAX_NEIGHBOUR_DISTANCE * MAX_NEIGHBOUR_DISTANCE;
            }
            if far_enough && close_enough {
                return Ok(candidate);
            }
        }
        tracing::warn!(attempts = PLACEMENT_ATTEMPTS, "No planet position found");
        Err(GameError::InvalidState(format!(
            "no free planet position after {PLACEMENT_ATTEMPTS} attempts"
        )))
    }

    // ========================================================================
    // Settlements and buildings
    // ========================================================================

    /// Found a settlement in the lowest free slot.
    pub fn found_settlement(&mut self, planet: PlanetId) -> Result<SettlementId> {
        planet_mut(&mut self.planets, planet)?
            .found_settlement(self.rules.max_settlements, &mut self.ids)
    }

    /// Build a level-1 building on a settlement.
    pub fn build(
        &mut self,
        planet: PlanetId,
        settlement: SettlementId,
        kind: BuildingKind,
        position: GridPos,
        catalog: &PropertyCatalog,
    ) -> Result<BuildingId> {
        planet_mut(&mut self.planets, planet)?.build(settlement, kind, position, catalog, &mut self.ids)
    }

    /// Demolish a building and everything it owns.
    pub fn remove_building(&mut self, planet: PlanetId, building: BuildingId) -> Result<()> {
        let removed = planet_mut(&mut self.planets, planet)?.remove_building(building)?;
        self.purge(&removed);
        Ok(())
    }

    /// Remove a settlement and everything on it.
    pub fn remove_settlement(&mut self, planet: PlanetId, settlement: SettlementId) -> Result<()> {
        let removed = planet_mut(&mut self.planets, planet)?.remove_settlement(settlement)?;
        for building in &removed.buildings {
            self.purge(building);
        }
        Ok(())
    }

    /// Drop galaxy-level references to a removed building's contents.
    fn purge(&mut self, building: &Building) {
        if let Some(barrack) = building.barrack() {
            for unit in &barrack.units {
                self.forget_unit(unit.id);
            }
        }
        if let Some(link) = building.warper().and_then(|w| w.link) {
            self.drop_link(link);
        }
        tracing::debug!(building = %building.id, kind = %building.kind(), "Building removed");
    }

    fn forget_unit(&mut self, unit: UnitId) {
        for attack in self.attacks.values_mut() {
            attack.forget_unit(unit);
        }
    }

    /// Start upgrading a building. Returns the new level.
    pub fn upgrade_building(
        &mut self,
        planet: PlanetId,
        building: BuildingId,
        catalog: &PropertyCatalog,
    ) -> Result<u32> {
        let (building, stockpile) =
            planet_mut(&mut self.planets, planet)?.building_and_stockpile(building)?;
        building.upgrade(stockpile, catalog)?;
        Ok(building.level)
    }

    /// Start a farm or mine filling up.
    pub fn start_gathering(
        &mut self,
        planet: PlanetId,
        building: BuildingId,
        catalog: &PropertyCatalog,
    ) -> Result<()> {
        let building = planet_mut(&mut self.planets, planet)?.building_mut(building)?;
        let (status, wrong_kind) = (building.status(), building.wrong_kind("farm or mine"));
        building
            .gatherer_mut()
            .ok_or(wrong_kind)?
            .start_gathering(status, catalog)
    }

    /// Move a full farm's or mine's store into the planet stockpile.
    pub fn collect_resources(&mut self, planet: PlanetId, building: BuildingId) -> Result<u64> {
        let (building, stockpile) =
            planet_mut(&mut self.planets, planet)?.building_and_stockpile(building)?;
        let (status, wrong_kind) = (building.status(), building.wrong_kind("farm or mine"));
        let resource = status.kind.gathered_resource().ok_or_else(|| wrong_kind.clone())?;
        building
            .gatherer_mut()
            .ok_or(wrong_kind)?
            .collect_resources(status, resource, stockpile)
    }

    // ========================================================================
    // Barracks
    // ========================================================================

    /// Queue a unit for training. `level` must match the barrack's current
    /// level for `kind`.
    pub fn train_unit(
        &mut self,
        planet: PlanetId,
        barrack: BuildingId,
        kind: UnitKind,
        level: u32,
        catalog: &PropertyCatalog,
    ) -> Result<UnitId> {
        let (building, stockpile) =
            planet_mut(&mut self.planets, planet)?.building_and_stockpile(barrack)?;
        let (status, wrong_kind) = (building.status(), building.wrong_kind("barrack"));
        let barrack = building.barrack_mut().ok_or(wrong_kind)?;
        barrack.can_train(status, kind, level, stockpile.rations, catalog)?;
        let id = self.ids.next();
        barrack.train_unit(status, id, kind, level, stockpile, catalog)
    }

    /// Raise the training level of a unit type. Returns the new level.
    pub fn upgrade_unit_type(
        &mut self,
        planet: PlanetId,
        barrack: BuildingId,
        kind: UnitKind,
        catalog: &PropertyCatalog,
    ) -> Result<u32> {
        let (building, stockpile) =
            planet_mut(&mut self.planets, planet)?.building_and_stockpile(barrack)?;
        let wrong_kind = building.wrong_kind("barrack");
        building
            .barrack_mut()
            .ok_or(wrong_kind)?
            .upgrade_unit_type(kind, stockpile, catalog)
    }

    /// Training gating flags for a barrack.
    pub fn disabled_units(
        &self,
        planet: PlanetId,
        barrack: BuildingId,
        catalog: &PropertyCatalog,
    ) -> Result<DisabledUnits> {
        let planet = self.planet(planet)?;
        let building = planet.building(barrack)?;
        building
            .barrack()
            .ok_or_else(|| building.wrong_kind("barrack"))?
            .disabled_units(building.status(), planet.stockpile.rations, catalog)
    }

    // ========================================================================
    // Combat
    // ========================================================================

    /// Open an attack from `attacker` on `defender`.
    ///
    /// # Errors
    ///
    /// Either planet already takes part in an attack in any role, the
    /// planets are the same, or they share an owner.
    pub fn attack(&mut self, attacker: PlanetId, defender: PlanetId) -> Result<AttackId> {
        if attacker == defender {
            return Err(GameError::SamePlanet(attacker));
        }
        if self.planet(attacker)?.owner == self.planet(defender)?.owner {
            return Err(GameError::SameOwner);
        }
        for planet in [attacker, defender] {
            if self.offence.contains_key(&planet) {
                return Err(GameError::AlreadyAttacking(planet));
            }
            if self.defence.contains_key(&planet) {
                return Err(GameError::AlreadyDefending(planet));
            }
        }

        let id = self.ids.next();
        self.attacks.insert(id, Attack::new(id, attacker, defender));
        self.offence.insert(attacker, id);
        self.defence.insert(defender, id);
        tracing::info!(attack = %id, %attacker, %defender, "Attack started");
        Ok(id)
    }

    /// Choose the attacker's unit for the next round.
    pub fn select_attack_unit(&mut self, attack: AttackId, unit: UnitId) -> Result<()> {
        let session = self.attacks.get(&attack).ok_or(GameError::AttackNotFound(attack))?;
        combat::check_selectable(self.planet(session.attacker)?, unit)?;
        if let Some(session) = self.attacks.get_mut(&attack) {
            session.selected_attack_unit = Some(unit);
        }
        Ok(())
    }

    /// Choose the defender's unit for the next round.
    pub fn select_defence_unit(&mut self, attack: AttackId, unit: UnitId) -> Result<()> {
        let session = self.attacks.get(&attack).ok_or(GameError::AttackNotFound(attack))?;
        combat::check_selectable(self.planet(session.defender)?, unit)?;
        if let Some(session) = self.attacks.get_mut(&attack) {
            session.selected_defence_unit = Some(unit);
        }
        Ok(())
    }

    /// Play one round. With `auto_conclude` a round that ends the battle also
    /// settles it and closes the attack.
    pub fn play_round(
        &mut self,
        attack: AttackId,
        options: RoundOptions,
        catalog: &PropertyCatalog,
        dice: &mut dyn Dice,
    ) -> Result<RoundReport> {
        let mut session = self.attack_session(attack)?.clone();
        let report = self.with_planet_pair(session.attacker, session.defender, |a, d| {
            combat::resolve_round(&mut session, a, d, options, catalog, dice)
        })?;
        self.attacks.insert(attack, session);

        if let (Some(outcome), true) = (report.outcome, options.auto_conclude) {
            self.conclude(attack, outcome)?;
        }
        Ok(report)
    }

    /// Settle an attack as a win: the attacker plunders a quarter of the
    /// defender's resources.
    pub fn win(&mut self, attack: AttackId) -> Result<Spoils> {
        self.conclude(attack, BattleOutcome::Win)
    }

    /// Settle an attack as a loss: the attacker keeps 90% of its resources.
    pub fn lose(&mut self, attack: AttackId) -> Result<Spoils> {
        self.conclude(attack, BattleOutcome::Lose)
    }

    fn conclude(&mut self, attack: AttackId, outcome: BattleOutcome) -> Result<Spoils> {
        let session = self.attack_session(attack)?.clone();
        let spoils = match outcome {
            BattleOutcome::Win => self.with_planet_pair(session.attacker, session.defender, |a, d| {
                Ok(combat::plunder(&mut a.stockpile, &mut d.stockpile))
            })?,
            BattleOutcome::Lose => {
                combat::retreat_penalty(&mut planet_mut(&mut self.planets, session.attacker)?.stockpile)
            }
        };
        self.attacks.remove(&attack);
        self.offence.remove(&session.attacker);
        self.defence.remove(&session.defender);
        tracing::info!(
            attack = %attack,
            ?outcome,
            rations = spoils.rations,
            materials = spoils.materials,
            "Attack concluded"
        );
        Ok(spoils)
    }

    /// Run `f` with two distinct planets borrowed mutably.
    fn with_planet_pair<T>(
        &mut self,
        first: PlanetId,
        second: PlanetId,
        f: impl FnOnce(&mut Planet, &mut Planet) -> Result<T>,
    ) -> Result<T> {
        if first == second {
            return Err(GameError::SamePlanet(first));
        }
        let mut a = self.planets.remove(&first).ok_or(GameError::PlanetNotFound(first))?;
        let Some(mut b) = self.planets.remove(&second) else {
            self.planets.insert(first, a);
            return Err(GameError::PlanetNotFound(second));
        };
        let result = f(&mut a, &mut b);
        self.planets.insert(first, a);
        self.planets.insert(second, b);
        result
    }

    // ========================================================================
    // Warp links
    // ========================================================================

    /// Link `planet` to `target` through one of its warpers.
    ///
    /// Costs [`WARP_LINK_COST`] materials from `planet`. If the pair is
    /// already linked the existing link is returned and nothing is charged.
    ///
    /// # Errors
    ///
    /// [`GameError::WarperAlreadyLinked`] when the warper powers a link to
    /// another planet; validation errors for a bad target or short materials.
    pub fn create_link(&mut self, planet: PlanetId, warper: BuildingId, target: PlanetId) -> Result<LinkId> {
        if planet == target {
            return Err(GameError::SamePlanet(planet));
        }
        self.planet(target)?;
        if let Some(existing) = self.link_by_pair.get(&movement::pair_key(planet, target)) {
            return Ok(*existing);
        }

        let (building, stockpile) =
            planet_mut(&mut self.planets, planet)?.building_and_stockpile(warper)?;
        let wrong_kind = building.wrong_kind("warper");
        let role = building.warper_mut().ok_or(wrong_kind)?;
        if let Some(link) = role.link {
            return Err(GameError::WarperAlreadyLinked { warper, link });
        }
        stockpile.spend(ResourceKind::Materials, WARP_LINK_COST)?;

        let id = self.ids.next();
        role.link = Some(id);
        let link = PlanetLink {
            id,
            from: planet,
            to: target,
            warper,
        };
        self.link_by_pair.insert(link.pair_key(), id);
        self.links.insert(id, link);
        tracing::info!(link = %id, from = %planet, to = %target, cost = WARP_LINK_COST, "Warp link created");
        Ok(id)
    }

    /// Remove a link and free its warper.
    pub fn delete_link(&mut self, link: LinkId) -> Result<PlanetLink> {
        let removed = self.drop_link(link).ok_or(GameError::LinkNotFound(link))?;
        if let Some(role) = self
            .planets
            .get_mut(&removed.from)
            .and_then(|p| p.building_mut(removed.warper).ok())
            .and_then(Building::warper_mut)
        {
            role.link = None;
        }
        Ok(removed)
    }

    fn drop_link(&mut self, link: LinkId) -> Option<PlanetLink> {
        let removed = self.links.remove(&link)?;
        self.link_by_pair.remove(&removed.pair_key());
        tracing::debug!(%link, "Warp link removed");
        Some(removed)
    }

    /// Point a warper at the planet at `target`, or unlink it with `None`.
    ///
    /// All checks run before the old link is removed, so a failure leaves
    /// the old link in place.
    pub fn change_warp_link(
        &mut self,
        planet: PlanetId,
        warper: BuildingId,
        target: Option<Coordinates>,
    ) -> Result<Option<LinkId>> {
        let current = {
            let building = self.planet(planet)?.building(warper)?;
            building
                .warper()
                .ok_or_else(|| building.wrong_kind("warper"))?
                .link
        };

        let Some(position) = target else {
            if let Some(link) = current {
                self.delete_link(link)?;
            }
            return Ok(None);
        };

        let target = self.planet_at(position)?;
        if target == planet {
            return Err(GameError::SamePlanet(planet));
        }
        // An existing link between the pair is kept as is, whoever owns it
        if let Some(existing) = self.link_by_pair.get(&movement::pair_key(planet, target)) {
            return Ok(Some(*existing));
        }
        self.planet(planet)?
            .stockpile
            .ensure(ResourceKind::Materials, WARP_LINK_COST)?;

        if let Some(link) = current {
            self.delete_link(link)?;
        }
        self.create_link(planet, warper, target).map(Some)
    }

    /// Planets `planet` could still be linked to.
    pub fn possible_warp_targets(&self, planet: PlanetId) -> Result<Vec<PlanetId>> {
        self.planet(planet)?;
        Ok(self
            .planets
            .keys()
            .copied()
            .filter(|other| *other != planet && self.link_between(planet, *other).is_none())
            .collect())
    }

    /// Planet the warper currently links to.
    pub fn warp_target(&self, planet: PlanetId, warper: BuildingId) -> Result<Option<PlanetId>> {
        let building = self.planet(planet)?.building(warper)?;
        let role = building.warper().ok_or_else(|| building.wrong_kind("warper"))?;
        Ok(role
            .link
            .and_then(|id| self.links.get(&id))
            .and_then(|link| link.other_end(planet)))
    }

    /// Speed multiplier between two planets: 1 unless a link joins them.
    pub fn link_speed_factor(&self, a: PlanetId, b: PlanetId) -> Fixed {
        self.link_between(a, b)
            .and_then(|link| {
                let level = self.planets.get(&link.from)?.building(link.warper).ok()?.level;
                Some(Warper::speed_factor(level))
            })
            .unwrap_or(Fixed::ONE)
    }

    // ========================================================================
    // Spaceships
    // ========================================================================

    /// Seconds a ship from a spaceport of `spaceport_level` needs from
    /// `from` to `to`.
    pub fn travel_time(
        &self,
        from: PlanetId,
        to: PlanetId,
        spaceport_level: u32,
        catalog: &PropertyCatalog,
    ) -> Result<Seconds> {
        let distance = self.planet(from)?.position.distance(self.planet(to)?.position);
        let capacity = ShipCapacity::at_level(spaceport_level, catalog)?;
        movement::travel_time(distance, capacity.speed, self.link_speed_factor(from, to))
    }

    /// Load rations from the planet onto a docked ship.
    pub fn board_rations(
        &mut self,
        planet: PlanetId,
        spaceport: BuildingId,
        amount: u64,
        catalog: &PropertyCatalog,
    ) -> Result<()> {
        self.board_resource(planet, spaceport, ResourceKind::Rations, amount, catalog)
    }

    /// Load building materials from the planet onto a docked ship.
    pub fn board_materials(
        &mut self,
        planet: PlanetId,
        spaceport: BuildingId,
        amount: u64,
        catalog: &PropertyCatalog,
    ) -> Result<()> {
        self.board_resource(planet, spaceport, ResourceKind::Materials, amount, catalog)
    }

    fn board_resource(
        &mut self,
        planet: PlanetId,
        spaceport: BuildingId,
        resource: ResourceKind,
        amount: u64,
        catalog: &PropertyCatalog,
    ) -> Result<()> {
        let (ship, level, stockpile) =
            planet_mut(&mut self.planets, planet)?.ship_and_stockpile(spaceport)?;
        let capacity = ShipCapacity::at_level(level, catalog)?;
        ship.board_resource(resource, amount, &capacity, stockpile)
    }

    /// Move a trained unit from a barrack onto a docked ship.
    pub fn board_attack_unit(
        &mut self,
        planet: PlanetId,
        spaceport: BuildingId,
        unit: UnitId,
        catalog: &PropertyCatalog,
    ) -> Result<()> {
        {
            let home = self.planet(planet)?;
            let port = home.building(spaceport)?;
            let ship = &port
                .spaceport()
                .ok_or_else(|| port.wrong_kind("spaceport"))?
                .ship;
            let boarding = home.find_unit(unit).ok_or(GameError::UnitNotFound(unit))?;
            let capacity = ShipCapacity::at_level(port.level, catalog)?;
            ship.check_boarding(boarding, &capacity, catalog)?;
        }
        let home = planet_mut(&mut self.planets, planet)?;
        let boarding = home.take_unit(unit).ok_or(GameError::UnitNotFound(unit))?;
        home.ship_mut(spaceport)?.0.load_unit(boarding);
        self.forget_unit(unit);
        Ok(())
    }

    /// Unload a docked ship onto its own planet. Returns how many units
    /// stayed aboard for lack of barrack space.
    pub fn unload_docked(
        &mut self,
        planet: PlanetId,
        spaceport: BuildingId,
        catalog: &PropertyCatalog,
    ) -> Result<usize> {
        let home = planet_mut(&mut self.planets, planet)?;
        let (ship, _) = home.ship_mut(spaceport)?;
        ship.ensure_docked()?;
        let cargo = ship.take_cargo();
        let kept = unload(home, cargo, catalog)?;
        let count = kept.len();
        home.ship_mut(spaceport)?.0.cargo.units = kept;
        Ok(count)
    }

    /// Send a docked ship to another planet. Returns the leg duration.
    pub fn move_from_to_planet(
        &mut self,
        planet: PlanetId,
        spaceport: BuildingId,
        to: PlanetId,
        catalog: &PropertyCatalog,
    ) -> Result<Seconds> {
        if planet == to {
            return Err(GameError::SamePlanet(planet));
        }
        let port = self.planet(planet)?.building(spaceport)?;
        let level = port.level;
        let ship = &port
            .spaceport()
            .ok_or_else(|| port.wrong_kind("spaceport"))?
            .ship;
        ship.ensure_docked()?;
        let time = self.travel_time(planet, to, level, catalog)?;

        let (ship, _) = planet_mut(&mut self.planets, planet)?.ship_mut(spaceport)?;
        ship.depart(to, time);
        Ok(ship.moving_time_left)
    }

    /// Whether some barrack on `destination` could take a unit of `kind`.
    pub fn check_space_in_barracks(
        &self,
        destination: PlanetId,
        kind: UnitKind,
        catalog: &PropertyCatalog,
    ) -> Result<bool> {
        self.planet(destination)?
            .has_barrack_room(catalog.unit_size(kind)?, catalog)
    }

    /// Seconds until the ship at `spaceport` is docked again.
    pub fn return_time(&self, planet: PlanetId, spaceport: BuildingId) -> Result<Seconds> {
        let port = self.planet(planet)?.building(spaceport)?;
        Ok(port
            .spaceport()
            .ok_or_else(|| port.wrong_kind("spaceport"))?
            .ship
            .return_time(planet))
    }

    /// Cargo summary of the ship at `spaceport`.
    pub fn ship_description(&self, planet: PlanetId, spaceport: BuildingId) -> Result<String> {
        let port = self.planet(planet)?.building(spaceport)?;
        Ok(port
            .spaceport()
            .ok_or_else(|| port.wrong_kind("spaceport"))?
            .ship
            .description())
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Bring a planet up to `now`.
    ///
    /// Planets with ships heading here are advanced first, so deliveries
    /// that already happened are visible.
    pub fn advance_planet(
        &mut self,
        planet: PlanetId,
        now: Timestamp,
        catalog: &PropertyCatalog,
    ) -> Result<Vec<SimEvent>> {
        self.planet(planet)?;
        let senders: Vec<PlanetId> = self
            .planets
            .values()
            .filter(|p| p.id != planet && p.spaceports().any(|(_, _, s)| s.destination == Some(planet)))
            .map(|p| p.id)
            .collect();

        let mut events = Vec::new();
        for sender in senders {
            events.extend(self.advance_single(sender, now, catalog)?);
        }
        events.extend(self.advance_single(planet, now, catalog)?);
        Ok(events)
    }

    /// Bring every planet of `owner` up to `now`.
    pub fn advance_owner(
        &mut self,
        owner: OwnerId,
        now: Timestamp,
        catalog: &PropertyCatalog,
    ) -> Result<Vec<SimEvent>> {
        let owned: Vec<PlanetId> = self.planets_of(owner).map(|p| p.id).collect();
        let mut events = Vec::new();
        for planet in owned {
            events.extend(self.advance_planet(planet, now, catalog)?);
        }
        Ok(events)
    }

    /// Bring every planet up to `now`.
    pub fn advance_all(&mut self, now: Timestamp, catalog: &PropertyCatalog) -> Result<Vec<SimEvent>> {
        let all: Vec<PlanetId> = self.planets.keys().copied().collect();
        let mut events = Vec::new();
        for planet in all {
            events.extend(self.advance_single(planet, now, catalog)?);
        }
        Ok(events)
    }

    fn advance_single(
        &mut self,
        id: PlanetId,
        now: Timestamp,
        catalog: &PropertyCatalog,
    ) -> Result<Vec<SimEvent>> {
        let planet = planet_mut(&mut self.planets, id)?;
        let elapsed = now.seconds_since(planet.last_update);
        let mut events = planet.update(elapsed, catalog)?;
        planet.last_update = planet.last_update.max(now);

        let ports: Vec<BuildingId> = planet.spaceports().map(|(port, _, _)| port).collect();
        for port in ports {
            self.advance_ship(id, port, now, elapsed, catalog, &mut events)?;
        }
        Ok(events)
    }

    /// Move one ship through as many legs as `elapsed` covers, which ends at
    /// `now`.
    fn advance_ship(
        &mut self,
        home: PlanetId,
        port: BuildingId,
        now: Timestamp,
        elapsed: Seconds,
        catalog: &PropertyCatalog,
        events: &mut Vec<SimEvent>,
    ) -> Result<()> {
        let mut remaining = elapsed;
        for _ in 0..MAX_LEGS_PER_UPDATE {
            let home_planet = planet_mut(&mut self.planets, home)?;
            let (ship, level) = home_planet.ship_mut(port)?;
            let ship_id = ship.id;
            let (destination, leftover) = match ship.advance_leg(remaining) {
                Leg::Docked | Leg::InTransit => return Ok(()),
                Leg::Arrived {
                    destination,
                    leftover,
                } => (destination, leftover),
            };
            let cargo = ship.take_cargo();

            if destination == home {
                let kept = unload(home_planet, cargo, catalog)?;
                home_planet.ship_mut(port)?.0.cargo.units = kept;
                tracing::debug!(ship = %ship_id, planet = %home, "Ship returned");
                events.push(SimEvent::ShipReturned {
                    ship: ship_id,
                    planet: home,
                });
                return Ok(());
            }

            // Arriving units only share the destination's time from arrival on
            let arrival = now.minus_seconds(leftover);
            events.extend(self.advance_single(destination, arrival, catalog)?);
            let kept = unload(planet_mut(&mut self.planets, destination)?, cargo, catalog)?;
            let units_kept_aboard = kept.len();
            let back = self.travel_time(destination, home, level, catalog)?;
            let (ship, _) = planet_mut(&mut self.planets, home)?.ship_mut(port)?;
            ship.cargo.units = kept;
            ship.depart(home, back);
            tracing::debug!(ship = %ship_id, planet = %destination, units_kept_aboard, "Ship arrived");
            events.push(SimEvent::ShipArrived {
                ship: ship_id,
                planet: destination,
                units_kept_aboard,
            });
            remaining = leftover;
        }
        tracing::warn!(port = %port, legs = MAX_LEGS_PER_UPDATE, "Leg limit reached; dropping remaining time");
        Ok(())
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Hash of the full state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match bincode::serialize(self) {
            Ok(bytes) => hasher.write(&bytes),
            Err(e) => tracing::warn!(error = %e, "Galaxy not encodable for hashing"),
        }
        hasher.finish()
    }

    /// Encode the full state.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_snapshot(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize galaxy: {e}")))
    }

    /// Decode a state produced by [`to_snapshot`](Self::to_snapshot).
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_snapshot(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize galaxy: {e}")))
    }
}
