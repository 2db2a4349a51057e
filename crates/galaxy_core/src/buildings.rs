//! Buildings: shared state, upgrades and construction.
//!
//! A [`Building`] carries the fields every kind has (position, level,
//! construction timer) and a [`BuildingRole`] with the kind-specific part.
//! Each role implements [`Facility`], which is how the lazy update cascade and
//! upgrade checks reach the per-kind behaviour.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{attr, Category, PropertyCatalog};
use crate::components::{BuildingId, GridPos, IdAllocator, ResourceKind, SettlementId, Stockpile};
use crate::error::{GameError, Result};
use crate::events::SimEvent;
use crate::gathering::Gatherer;
use crate::math::{fixed_serde, Fixed, Seconds};
use crate::movement::{Spaceport, Warper};
use crate::training::Barrack;

/// Every building type that can be placed on a settlement grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Settlement centre; no behaviour of its own.
    TownHall,
    /// Gathers rations.
    Farm,
    /// Gathers building materials.
    Mine,
    /// Trains and stores attack units.
    Barrack,
    /// Docks one spaceship.
    Spaceport,
    /// Anchors one warp link.
    Warper,
}

impl BuildingKind {
    /// All building kinds.
    pub const ALL: [Self; 6] = [
        Self::TownHall,
        Self::Farm,
        Self::Mine,
        Self::Barrack,
        Self::Spaceport,
        Self::Warper,
    ];

    /// Catalog type name.
    #[must_use]
    pub const fn catalog_name(self) -> &'static str {
        match self {
            Self::TownHall => "town_hall",
            Self::Farm => "farm",
            Self::Mine => "mine",
            Self::Barrack => "barrack",
            Self::Spaceport => "spaceport",
            Self::Warper => "warper",
        }
    }

    /// Resource gathered, for farms and mines.
    #[must_use]
    pub const fn gathered_resource(self) -> Option<ResourceKind> {
        match self {
            Self::Farm => Some(ResourceKind::Rations),
            Self::Mine => Some(ResourceKind::Materials),
            _ => None,
        }
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.catalog_name())
    }
}

/// Snapshot of the shared building fields handed to role behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingStatus {
    /// Building id.
    pub id: BuildingId,
    /// Building kind.
    pub kind: BuildingKind,
    /// Current level.
    pub level: u32,
    /// Whether a build or upgrade is still running.
    pub under_construction: bool,
}

/// Mutable planet state available while a building advances.
pub struct UpdateContext<'a> {
    /// Balance numbers.
    pub catalog: &'a PropertyCatalog,
    /// The owning planet's resources.
    pub stockpile: &'a mut Stockpile,
    /// Collected events.
    pub events: &'a mut Vec<SimEvent>,
}

/// Per-kind behaviour of a building.
pub trait Facility {
    /// Advance this facility by `elapsed` seconds.
    fn advance(
        &mut self,
        status: BuildingStatus,
        elapsed: Seconds,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<()>;

    /// Extra reasons this facility cannot start an upgrade right now.
    fn check_upgrade(&self, _status: BuildingStatus) -> Result<()> {
        Ok(())
    }
}

/// Town hall role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TownHall;

impl Facility for TownHall {
    fn advance(&mut self, _: BuildingStatus, _: Seconds, _: &mut UpdateContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Kind-specific state of a building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingRole {
    /// Town hall.
    TownHall(TownHall),
    /// Farm.
    Farm(Gatherer),
    /// Mine.
    Mine(Gatherer),
    /// Barrack.
    Barrack(Barrack),
    /// Spaceport.
    Spaceport(Spaceport),
    /// Warper.
    Warper(Warper),
}

impl BuildingRole {
    /// Fresh role state for a new building. Spaceports commission their ship.
    pub fn new(kind: BuildingKind, ids: &mut IdAllocator) -> Self {
        match kind {
            BuildingKind::TownHall => Self::TownHall(TownHall),
            BuildingKind::Farm => Self::Farm(Gatherer::default()),
            BuildingKind::Mine => Self::Mine(Gatherer::default()),
            BuildingKind::Barrack => Self::Barrack(Barrack::new()),
            BuildingKind::Spaceport => Self::Spaceport(Spaceport::new(ids.next())),
            BuildingKind::Warper => Self::Warper(Warper::default()),
        }
    }

    /// Kind of this role.
    #[must_use]
    pub const fn kind(&self) -> BuildingKind {
        match self {
            Self::TownHall(_) => BuildingKind::TownHall,
            Self::Farm(_) => BuildingKind::Farm,
            Self::Mine(_) => BuildingKind::Mine,
            Self::Barrack(_) => BuildingKind::Barrack,
            Self::Spaceport(_) => BuildingKind::Spaceport,
            Self::Warper(_) => BuildingKind::Warper,
        }
    }

    fn facility(&self) -> &dyn Facility {
        match self {
            Self::TownHall(t) => t,
            Self::Farm(g) | Self::Mine(g) => g,
            Self::Barrack(b) => b,
            Self::Spaceport(s) => s,
            Self::Warper(w) => w,
        }
    }

    fn facility_mut(&mut self) -> &mut dyn Facility {
        match self {
            Self::TownHall(t) => t,
            Self::Farm(g) | Self::Mine(g) => g,
            Self::Barrack(b) => b,
            Self::Spaceport(s) => s,
            Self::Warper(w) => w,
        }
    }
}

/// A building on a settlement grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Unique id.
    pub id: BuildingId,
    /// Owning settlement.
    pub settlement_id: SettlementId,
    /// Grid slot, unique within the settlement.
    pub position: GridPos,
    /// Current level. Raised when an upgrade starts, not when it ends.
    pub level: u32,
    /// Seconds of construction left; while positive the role is disabled.
    #[serde(with = "fixed_serde")]
    pub construction_time_left: Seconds,
    /// Kind-specific state.
    pub role: BuildingRole,
}

impl Building {
    /// Place a new level-1 building, debiting its build cost.
    ///
    /// # Errors
    ///
    /// Fails without side effects when the planet cannot pay.
    pub fn construct(
        id: BuildingId,
        settlement_id: SettlementId,
        position: GridPos,
        kind: BuildingKind,
        stockpile: &mut Stockpile,
        catalog: &PropertyCatalog,
        ids: &mut IdAllocator,
    ) -> Result<Self> {
        let cost = catalog.building_u64(kind, 1, attr::BUILD_COST)?;
        let time = catalog.building(kind, 1, attr::UPGRADE_TIME)?;
        stockpile.spend(ResourceKind::Materials, cost)?;

        tracing::debug!(building = %id, %kind, %position, cost, "Construction started");
        Ok(Self {
            id,
            settlement_id,
            position,
            level: 1,
            construction_time_left: time,
            role: BuildingRole::new(kind, ids),
        })
    }

    /// Building kind.
    #[must_use]
    pub const fn kind(&self) -> BuildingKind {
        self.role.kind()
    }

    /// Whether a build or upgrade is running.
    #[must_use]
    pub fn under_construction(&self) -> bool {
        self.construction_time_left > Fixed::ZERO
    }

    /// Shared fields as handed to role behaviour.
    #[must_use]
    pub fn status(&self) -> BuildingStatus {
        BuildingStatus {
            id: self.id,
            kind: self.kind(),
            level: self.level,
            under_construction: self.under_construction(),
        }
    }

    /// Fail with [`GameError::UnderConstruction`] while building.
    pub fn ensure_operational(&self) -> Result<()> {
        if self.under_construction() {
            return Err(GameError::UnderConstruction(self.id));
        }
        Ok(())
    }

    /// Start an upgrade to the next level.
    ///
    /// Debits the next level's `build_cost` in materials, sets the construction
    /// timer to its `upgrade_time` and raises the level.
    ///
    /// # Errors
    ///
    /// Fails leaving everything unchanged when under construction, at the
    /// maximum level, blocked by the role (a farm that is gathering), or when
    /// materials are short.
    pub fn upgrade(&mut self, stockpile: &mut Stockpile, catalog: &PropertyCatalog) -> Result<()> {
        self.ensure_operational()?;
        let kind = self.kind();
        let max_level = catalog.max_level(Category::Building, kind.catalog_name())?;
        if self.level >= max_level {
            return Err(GameError::MaxLevelReached(max_level));
        }
        self.role.facility().check_upgrade(self.status())?;

        let next = self.level + 1;
        let cost = catalog.building_u64(kind, next, attr::BUILD_COST)?;
        let time = catalog.building(kind, next, attr::UPGRADE_TIME)?;
        stockpile.spend(ResourceKind::Materials, cost)?;

        self.construction_time_left = time;
        self.level = next;
        tracing::debug!(building = %self.id, %kind, level = next, cost, "Upgrade started");
        Ok(())
    }

    /// Advance construction and the role by `elapsed` seconds.
    pub fn advance(&mut self, elapsed: Seconds, ctx: &mut UpdateContext<'_>) -> Result<()> {
        if self.under_construction() {
            self.construction_time_left = (self.construction_time_left - elapsed).max(Fixed::ZERO);
            if !self.under_construction() {
                tracing::debug!(building = %self.id, kind = %self.kind(), level = self.level, "Construction finished");
                ctx.events.push(SimEvent::ConstructionFinished {
                    building: self.id,
                    kind: self.kind(),
                    level: self.level,
                });
            }
        }
        let status = self.status();
        self.role.facility_mut().advance(status, elapsed, ctx)
    }

    /// Gathering state, for farms and mines.
    #[must_use]
    pub const fn gatherer(&self) -> Option<&Gatherer> {
        match &self.role {
            BuildingRole::Farm(g) | BuildingRole::Mine(g) => Some(g),
            _ => None,
        }
    }

    /// Mutable gathering state, for farms and mines.
    pub fn gatherer_mut(&mut self) -> Option<&mut Gatherer> {
        match &mut self.role {
            BuildingRole::Farm(g) | BuildingRole::Mine(g) => Some(g),
            _ => None,
        }
    }

    /// Barrack state, for barracks.
    #[must_use]
    pub const fn barrack(&self) -> Option<&Barrack> {
        match &self.role {
            BuildingRole::Barrack(b) => Some(b),
            _ => None,
        }
    }

    /// Mutable barrack state, for barracks.
    pub fn barrack_mut(&mut self) -> Option<&mut Barrack> {
        match &mut self.role {
            BuildingRole::Barrack(b) => Some(b),
            _ => None,
        }
    }

    /// Spaceport state, for spaceports.
    #[must_use]
    pub const fn spaceport(&self) -> Option<&Spaceport> {
        match &self.role {
            BuildingRole::Spaceport(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable spaceport state, for spaceports.
    pub fn spaceport_mut(&mut self) -> Option<&mut Spaceport> {
        match &mut self.role {
            BuildingRole::Spaceport(s) => Some(s),
            _ => None,
        }
    }

    /// Warper state, for warpers.
    #[must_use]
    pub const fn warper(&self) -> Option<&Warper> {
        match &self.role {
            BuildingRole::Warper(w) => Some(w),
            _ => None,
        }
    }

    /// Mutable warper state, for warpers.
    pub fn warper_mut(&mut self) -> Option<&mut Warper> {
        match &mut self.role {
            BuildingRole::Warper(w) => Some(w),
            _ => None,
        }
    }

    /// Error for an operation addressed to the wrong kind of building.
    #[must_use]
    pub const fn wrong_kind(&self, expected: &'static str) -> GameError {
        GameError::WrongBuildingKind {
            building: self.id,
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(kind: BuildingKind, materials: u64) -> (Building, Stockpile, PropertyCatalog) {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut stock = Stockpile::new(800, materials);
        let mut ids = IdAllocator::new();
        let building = Building::construct(
            BuildingId::new(100),
            SettlementId::new(1),
            GridPos::new(0, 0),
            kind,
            &mut stock,
            &catalog,
            &mut ids,
        )
        .unwrap();
        (building, stock, catalog)
    }

    fn finish(building: &mut Building, stock: &mut Stockpile, catalog: &PropertyCatalog) {
        let mut events = Vec::new();
        let mut ctx = UpdateContext {
            catalog,
            stockpile: stock,
            events: &mut events,
        };
        let left = building.construction_time_left;
        building.advance(left, &mut ctx).unwrap();
    }

    #[test]
    fn test_construct_debits_and_sets_timer() {
        let (building, stock, _) = setup(BuildingKind::Farm, 10_000);
        assert_eq!(stock.materials, 9_950);
        assert_eq!(building.level, 1);
        assert_eq!(building.construction_time_left, Fixed::from_num(10));
        assert!(building.under_construction());
    }

    #[test]
    fn test_construct_insufficient_materials() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut stock = Stockpile::new(0, 10);
        let err = Building::construct(
            BuildingId::new(1),
            SettlementId::new(1),
            GridPos::new(0, 0),
            BuildingKind::Barrack,
            &mut stock,
            &catalog,
            &mut IdAllocator::new(),
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InsufficientResources { .. }));
        assert_eq!(stock.materials, 10);
    }

    #[test]
    fn test_upgrade_blocked_while_constructing() {
        let (mut building, mut stock, catalog) = setup(BuildingKind::Barrack, 10_000);
        let err = building.upgrade(&mut stock, &catalog).unwrap_err();
        assert_eq!(err, GameError::UnderConstruction(building.id));
        assert_eq!(building.level, 1);
    }

    #[test]
    fn test_upgrade_uses_next_level_cost() {
        let (mut building, mut stock, catalog) = setup(BuildingKind::Farm, 10_000);
        finish(&mut building, &mut stock, &catalog);
        building.upgrade(&mut stock, &catalog).unwrap();
        assert_eq!(stock.materials, 9_550);
        assert_eq!(building.level, 2);
        assert_eq!(building.construction_time_left, Fixed::from_num(60));
    }

    #[test]
    fn test_upgrade_stops_at_max_level() {
        let (mut building, mut stock, catalog) = setup(BuildingKind::Barrack, 100_000);
        for _ in 0..2 {
            finish(&mut building, &mut stock, &catalog);
            building.upgrade(&mut stock, &catalog).unwrap();
        }
        finish(&mut building, &mut stock, &catalog);
        let before = stock;
        let err = building.upgrade(&mut stock, &catalog).unwrap_err();
        assert_eq!(err, GameError::MaxLevelReached(3));
        assert_eq!(stock, before);
    }

    #[test]
    fn test_upgrade_insufficient_materials_leaves_state() {
        let (mut building, mut stock, catalog) = setup(BuildingKind::Farm, 60);
        finish(&mut building, &mut stock, &catalog);
        let err = building.upgrade(&mut stock, &catalog).unwrap_err();
        assert!(matches!(err, GameError::InsufficientResources { .. }));
        assert_eq!(building.level, 1);
        assert_eq!(building.construction_time_left, Fixed::ZERO);
        assert_eq!(stock.materials, 10);
    }

    #[test]
    fn test_construction_finished_event() {
        let (mut building, mut stock, catalog) = setup(BuildingKind::TownHall, 0);
        // Level 1 town hall has no construction time
        assert!(!building.under_construction());

        let (mut farm, _, _) = setup(BuildingKind::Farm, 100);
        let mut events = Vec::new();
        let mut ctx = UpdateContext {
            catalog: &catalog,
            stockpile: &mut stock,
            events: &mut events,
        };
        farm.advance(Fixed::from_num(4), &mut ctx).unwrap();
        building.advance(Fixed::from_num(4), &mut ctx).unwrap();
        assert!(ctx.events.is_empty());
        farm.advance(Fixed::from_num(6), &mut ctx).unwrap();
        assert_eq!(
            events,
            vec![SimEvent::ConstructionFinished {
                building: farm.id,
                kind: BuildingKind::Farm,
                level: 1
            }]
        );
    }

    #[test]
    fn test_spaceport_commissions_ship() {
        let (building, _, _) = setup(BuildingKind::Spaceport, 1_000);
        assert!(building.spaceport().is_some());
        assert!(building.barrack().is_none());
    }
}
