//! Planets and their settlements.
//!
//! A [`Planet`] is the aggregate root: it exclusively owns its settlements,
//! their buildings, the units garrisoned in barracks and the ships docked at
//! spaceports. Removing any of them is an explicit recursive operation here.

use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingKind, BuildingRole, UpdateContext};
use crate::catalog::{attr, PropertyCatalog};
use crate::clock::Timestamp;
use crate::components::{
    BuildingId, GridPos, IdAllocator, OwnerId, PlanetId, ResourceKind, SettlementId, ShipId,
    Stockpile, UnitId, GRID_SIZE,
};
use crate::error::{GameError, Result};
use crate::events::SimEvent;
use crate::math::{Coordinates, Seconds};
use crate::movement::Spaceship;
use crate::units::{AttackUnit, PerUnitKind, UnitKind};

/// Default number of settlements a planet may hold.
pub const MAX_SETTLEMENTS: usize = 3;

/// Grid slot where a new planet's town hall is placed.
pub const TOWN_HALL_SLOT: GridPos = GridPos::new(2, 2);

/// Occupancy of a settlement grid, indexed `[y][x]`.
pub type Grid<'a> = [[Option<&'a Building>; GRID_SIZE as usize]; GRID_SIZE as usize];

// ============================================================================
// Settlement
// ============================================================================

/// A 5x5 grid of building slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Unique id.
    pub id: SettlementId,
    /// Slot number on the planet.
    pub number: u8,
    /// Buildings in construction order.
    pub buildings: Vec<Building>,
}

impl Settlement {
    /// Empty settlement.
    #[must_use]
    pub const fn new(id: SettlementId, number: u8) -> Self {
        Self {
            id,
            number,
            buildings: Vec::new(),
        }
    }

    /// Building occupying `position`, if any.
    #[must_use]
    pub fn building_at(&self, position: GridPos) -> Option<&Building> {
        self.buildings.iter().find(|b| b.position == position)
    }

    /// Occupancy projection of the grid.
    #[must_use]
    pub fn grid(&self) -> Grid<'_> {
        let mut grid: Grid<'_> = [[None; GRID_SIZE as usize]; GRID_SIZE as usize];
        for building in &self.buildings {
            if building.position.in_bounds() {
                grid[usize::from(building.position.y)][usize::from(building.position.x)] =
                    Some(building);
            }
        }
        grid
    }

    /// Place a new level-1 building.
    ///
    /// # Errors
    ///
    /// [`GameError::OutOfGrid`], [`GameError::SlotOccupied`], or the build
    /// cost cannot be paid. Nothing changes on failure.
    pub fn build(
        &mut self,
        kind: BuildingKind,
        position: GridPos,
        stockpile: &mut Stockpile,
        catalog: &PropertyCatalog,
        ids: &mut IdAllocator,
    ) -> Result<BuildingId> {
        if !position.in_bounds() {
            return Err(GameError::OutOfGrid(position));
        }
        if self.building_at(position).is_some() {
            return Err(GameError::SlotOccupied(position));
        }
        // Keep the id counter untouched when the planet can't pay
        stockpile.ensure(
            ResourceKind::Materials,
            catalog.building_u64(kind, 1, attr::BUILD_COST)?,
        )?;
        let id = ids.next();
        let building = Building::construct(id, self.id, position, kind, stockpile, catalog, ids)?;
        self.buildings.push(building);
        Ok(id)
    }

    /// Remove a building with everything it owns.
    pub fn remove_building(&mut self, id: BuildingId) -> Option<Building> {
        let index = self.buildings.iter().position(|b| b.id == id)?;
        Some(self.buildings.remove(index))
    }
}

// ============================================================================
// Planet
// ============================================================================

/// A planet: owner, position, resource ledger and settlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planet {
    /// Unique id.
    pub id: PlanetId,
    /// Owning player.
    pub owner: OwnerId,
    /// Display name.
    pub name: String,
    /// Galaxy coordinates.
    pub position: Coordinates,
    /// Rations and building materials.
    pub stockpile: Stockpile,
    /// Settlements, at most the galaxy's settlement limit.
    pub settlements: Vec<Settlement>,
    /// When the planet was last advanced.
    pub last_update: Timestamp,
}

impl Planet {
    /// A planet with no settlements.
    #[must_use]
    pub fn new(
        id: PlanetId,
        owner: OwnerId,
        name: impl Into<String>,
        position: Coordinates,
        stockpile: Stockpile,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            owner,
            name: name.into(),
            position,
            stockpile,
            settlements: Vec::new(),
            last_update: now,
        }
    }

    // ------------------------------------------------------------------------
    // Settlements
    // ------------------------------------------------------------------------

    /// Found a settlement in the lowest free slot.
    ///
    /// # Errors
    ///
    /// [`GameError::SettlementLimit`] when all `limit` slots are taken.
    pub fn found_settlement(&mut self, limit: usize, ids: &mut IdAllocator) -> Result<SettlementId> {
        let number = (0..limit)
            .filter_map(|n| u8::try_from(n).ok())
            .find(|n| self.settlements.iter().all(|s| s.number != *n))
            .ok_or(GameError::SettlementLimit(self.settlements.len()))?;
        let id = ids.next();
        self.settlements.push(Settlement::new(id, number));
        tracing::debug!(planet = %self.id, settlement = %id, number, "Settlement founded");
        Ok(id)
    }

    /// Remove a settlement with every building on it.
    pub fn remove_settlement(&mut self, id: SettlementId) -> Result<Settlement> {
        let index = self
            .settlements
            .iter()
            .position(|s| s.id == id)
            .ok_or(GameError::SettlementNotFound(id))?;
        Ok(self.settlements.remove(index))
    }

    /// Look up a settlement.
    pub fn settlement(&self, id: SettlementId) -> Result<&Settlement> {
        self.settlements
            .iter()
            .find(|s| s.id == id)
            .ok_or(GameError::SettlementNotFound(id))
    }

    /// Grid projection of one settlement.
    pub fn grid(&self, settlement: SettlementId) -> Result<Grid<'_>> {
        Ok(self.settlement(settlement)?.grid())
    }

    /// Build on one of this planet's settlements, paying from its stockpile.
    pub fn build(
        &mut self,
        settlement: SettlementId,
        kind: BuildingKind,
        position: GridPos,
        catalog: &PropertyCatalog,
        ids: &mut IdAllocator,
    ) -> Result<BuildingId> {
        let target = self
            .settlements
            .iter_mut()
            .find(|s| s.id == settlement)
            .ok_or(GameError::SettlementNotFound(settlement))?;
        target.build(kind, position, &mut self.stockpile, catalog, ids)
    }

    /// Demolish a building with everything it owns.
    pub fn remove_building(&mut self, id: BuildingId) -> Result<Building> {
        self.settlements
            .iter_mut()
            .find_map(|s| s.remove_building(id))
            .ok_or(GameError::BuildingNotFound(id))
    }

    // ------------------------------------------------------------------------
    // Buildings
    // ------------------------------------------------------------------------

    /// Every building, settlement by settlement, in construction order.
    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.settlements.iter().flat_map(|s| s.buildings.iter())
    }

    /// Every building, mutably.
    pub fn buildings_mut(&mut self) -> impl Iterator<Item = &mut Building> {
        self.settlements.iter_mut().flat_map(|s| s.buildings.iter_mut())
    }

    /// Look up a building.
    pub fn building(&self, id: BuildingId) -> Result<&Building> {
        self.buildings()
            .find(|b| b.id == id)
            .ok_or(GameError::BuildingNotFound(id))
    }

    /// Look up a building mutably.
    pub fn building_mut(&mut self, id: BuildingId) -> Result<&mut Building> {
        self.buildings_mut()
            .find(|b| b.id == id)
            .ok_or(GameError::BuildingNotFound(id))
    }

    /// Look up a building together with this planet's stockpile.
    pub fn building_and_stockpile(
        &mut self,
        id: BuildingId,
    ) -> Result<(&mut Building, &mut Stockpile)> {
        let building = self
            .settlements
            .iter_mut()
            .flat_map(|s| s.buildings.iter_mut())
            .find(|b| b.id == id)
            .ok_or(GameError::BuildingNotFound(id))?;
        Ok((building, &mut self.stockpile))
    }

    // ------------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------------

    /// Every unit garrisoned in a barrack, training or not.
    pub fn garrison(&self) -> impl Iterator<Item = &AttackUnit> {
        self.buildings()
            .filter_map(Building::barrack)
            .flat_map(|b| b.units.iter())
    }

    /// Look up a garrisoned unit.
    #[must_use]
    pub fn find_unit(&self, id: UnitId) -> Option<&AttackUnit> {
        self.garrison().find(|u| u.id == id)
    }

    /// Look up a garrisoned unit mutably.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut AttackUnit> {
        self.buildings_mut()
            .filter_map(Building::barrack_mut)
            .find_map(|b| b.unit_mut(id))
    }

    /// Remove a garrisoned unit from its barrack.
    pub fn take_unit(&mut self, id: UnitId) -> Option<AttackUnit> {
        self.buildings_mut()
            .filter_map(Building::barrack_mut)
            .find_map(|b| b.take_unit(id))
    }

    /// Trained garrisoned units, strongest first, ties by id.
    ///
    /// Each entry carries the unit's current attack power.
    pub fn available_units(&self, catalog: &PropertyCatalog) -> Result<Vec<(&AttackUnit, u32)>> {
        let mut units = self
            .garrison()
            .filter(|u| !u.is_training())
            .map(|u| Ok((u, u.attack_power(catalog)?)))
            .collect::<Result<Vec<_>>>()?;
        units.sort_by(|(a, pa), (b, pb)| pb.cmp(pa).then(a.id.cmp(&b.id)));
        Ok(units)
    }

    /// Strongest trained unit, optionally of one type.
    pub fn strongest_unit(
        &self,
        kind: Option<UnitKind>,
        catalog: &PropertyCatalog,
    ) -> Result<Option<UnitId>> {
        Ok(self
            .available_units(catalog)?
            .into_iter()
            .find(|(u, _)| kind.map_or(true, |k| u.kind() == k))
            .map(|(u, _)| u.id))
    }

    /// Summed attack power of every trained garrisoned unit.
    pub fn attack_power(&self, catalog: &PropertyCatalog) -> Result<u64> {
        self.garrison()
            .filter(|u| !u.is_training())
            .try_fold(0u64, |total, u| {
                Ok(total.saturating_add(u64::from(u.attack_power(catalog)?)))
            })
    }

    /// Trained garrisoned units counted by type.
    #[must_use]
    pub fn transportable_unit_counts(&self) -> PerUnitKind<u32> {
        let mut counts = PerUnitKind::splat(0u32);
        for unit in self.garrison().filter(|u| !u.is_training()) {
            *counts.get_mut(unit.kind()) += 1;
        }
        counts
    }

    /// Number of trained garrisoned units.
    #[must_use]
    pub fn living_units(&self) -> usize {
        self.garrison().filter(|u| !u.is_training()).count()
    }

    /// Whether some barrack here has strict room for a unit of `size`.
    pub fn has_barrack_room(&self, size: u32, catalog: &PropertyCatalog) -> Result<bool> {
        for building in self.buildings() {
            if let Some(barrack) = building.barrack() {
                if barrack.has_room_for(building.level, size, catalog)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Garrison arriving units in barracks with strict room, in building
    /// order. Returns the units that found no space.
    pub fn receive_units(
        &mut self,
        units: Vec<AttackUnit>,
        catalog: &PropertyCatalog,
    ) -> Result<Vec<AttackUnit>> {
        let mut leftover = Vec::new();
        'units: for unit in units {
            let size = unit.size(catalog)?;
            for building in self.buildings_mut() {
                let (id, level) = (building.id, building.level);
                if let Some(barrack) = building.barrack_mut() {
                    if barrack.has_room_for(level, size, catalog)? {
                        barrack.receive_unit(id, unit);
                        continue 'units;
                    }
                }
            }
            leftover.push(unit);
        }
        Ok(leftover)
    }

    // ------------------------------------------------------------------------
    // Ships
    // ------------------------------------------------------------------------

    /// Spaceports as `(building, level, ship)`.
    pub fn spaceports(&self) -> impl Iterator<Item = (BuildingId, u32, &Spaceship)> {
        self.buildings()
            .filter_map(|b| b.spaceport().map(|s| (b.id, b.level, &s.ship)))
    }

    /// Spaceport commissioning `ship`.
    #[must_use]
    pub fn spaceport_of(&self, ship: ShipId) -> Option<BuildingId> {
        self.spaceports()
            .find(|(_, _, s)| s.id == ship)
            .map(|(id, _, _)| id)
    }

    /// The ship docked at `spaceport`, mutably, with the port's level.
    pub fn ship_mut(&mut self, spaceport: BuildingId) -> Result<(&mut Spaceship, u32)> {
        let (ship, level, _) = self.ship_and_stockpile(spaceport)?;
        Ok((ship, level))
    }

    /// The ship at `spaceport` and the planet's stockpile, for boarding.
    pub fn ship_and_stockpile(
        &mut self,
        spaceport: BuildingId,
    ) -> Result<(&mut Spaceship, u32, &mut Stockpile)> {
        let (building, stockpile) = self.building_and_stockpile(spaceport)?;
        let (level, wrong_kind) = (building.level, building.wrong_kind("spaceport"));
        match &mut building.role {
            BuildingRole::Spaceport(port) => Ok((&mut port.ship, level, stockpile)),
            _ => Err(wrong_kind),
        }
    }

    // ------------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------------

    /// Advance every building by `elapsed` seconds.
    ///
    /// Ships are not moved here; see the galaxy.
    pub fn update(&mut self, elapsed: Seconds, catalog: &PropertyCatalog) -> Result<Vec<SimEvent>> {
        let mut events = Vec::new();
        let mut ctx = UpdateContext {
            catalog,
            stockpile: &mut self.stockpile,
            events: &mut events,
        };
        for building in self.settlements.iter_mut().flat_map(|s| s.buildings.iter_mut()) {
            building.advance(elapsed, &mut ctx)?;
        }
        Ok(events)
    }
}
