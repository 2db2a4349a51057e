//! Barrack: training queue, unit storage, upkeep and unit-type levels.
//!
//! Units stay in the barrack's unit list from the moment they are queued.
//! While training they hold a dense 1-based `training_pos`; the unit at
//! position 1 is the one whose timer runs.

use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingKind, BuildingStatus, Facility, UpdateContext};
use crate::catalog::{attr, Category, PropertyCatalog};
use crate::components::{BuildingId, ResourceKind, Stockpile, UnitId};
use crate::error::{GameError, Result};
use crate::events::SimEvent;
use crate::math::{Fixed, Seconds};
use crate::units::{AttackUnit, PerUnitKind, UnitHome, UnitKind, UnitVariant, Upkeep};

/// Maximum number of units queued for training at once.
pub const MAX_QUEUE_DEPTH: usize = 5;

/// Per-type gating flags for the training UI.
pub type DisabledUnits = PerUnitKind<bool>;

/// Barrack state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barrack {
    /// Level new units of each type are trained at.
    pub unit_levels: PerUnitKind<u32>,
    /// Stored and training units.
    pub units: Vec<AttackUnit>,
}

impl Default for Barrack {
    fn default() -> Self {
        Self::new()
    }
}

impl Barrack {
    /// Empty barrack training every type at level 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            unit_levels: PerUnitKind::splat(1),
            units: Vec::new(),
        }
    }

    /// Storage available at a barrack level.
    pub fn max_capacity(level: u32, catalog: &PropertyCatalog) -> Result<u32> {
        Ok(catalog
            .building(BuildingKind::Barrack, level, attr::MAX_CAPACITY)?
            .saturating_to_num::<u32>())
    }

    /// Space used by every unit, training or not.
    pub fn space_taken(&self, catalog: &PropertyCatalog) -> Result<u32> {
        self.units.iter().try_fold(0u32, |total, unit| {
            Ok(total.saturating_add(unit.size(catalog)?))
        })
    }

    /// Number of units in the training queue.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.units.iter().filter(|u| u.is_training()).count()
    }

    /// Training units in queue order.
    #[must_use]
    pub fn training_queue(&self) -> Vec<&AttackUnit> {
        let mut queue: Vec<&AttackUnit> = self.units.iter().filter(|u| u.is_training()).collect();
        queue.sort_by_key(|u| u.training_pos);
        queue
    }

    /// Units that have finished training.
    pub fn available_units(&self) -> impl Iterator<Item = &AttackUnit> {
        self.units.iter().filter(|u| !u.is_training())
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&AttackUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Look up a unit mutably.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut AttackUnit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// Check whether a unit of `kind` at `level` can be queued.
    ///
    /// Checks run in a fixed order and the first failure is returned: level
    /// mismatch, construction, storage, rations, queue depth, unlock level.
    pub fn can_train(
        &self,
        status: BuildingStatus,
        kind: UnitKind,
        level: u32,
        rations: u64,
        catalog: &PropertyCatalog,
    ) -> Result<()> {
        let unlocked = *self.unit_levels.get(kind);
        if level != unlocked {
            return Err(GameError::UnitLevelMismatch {
                kind,
                requested: level,
                unlocked,
            });
        }
        if status.under_construction {
            return Err(GameError::UnderConstruction(status.id));
        }

        let taken = self.space_taken(catalog)?;
        let capacity = Self::max_capacity(status.level, catalog)?;
        let size = catalog.unit_size(kind)?;
        if taken.saturating_add(size) > capacity {
            return Err(GameError::BarrackFull {
                taken,
                capacity,
                size,
            });
        }

        let cost = catalog.unit_u64(kind, level, attr::TRAINING_COST)?;
        if rations < cost {
            return Err(GameError::InsufficientResources {
                resource: ResourceKind::Rations,
                required: cost,
                available: rations,
            });
        }

        let queued = self.queue_len();
        if queued >= MAX_QUEUE_DEPTH {
            return Err(GameError::QueueFull(queued));
        }

        let required = kind.unlock_level();
        if status.level < required {
            return Err(GameError::UnitLocked { kind, required });
        }
        Ok(())
    }

    /// Queue a new unit, debiting its training cost.
    pub fn train_unit(
        &mut self,
        status: BuildingStatus,
        id: UnitId,
        kind: UnitKind,
        level: u32,
        stockpile: &mut Stockpile,
        catalog: &PropertyCatalog,
    ) -> Result<UnitId> {
        self.can_train(status, kind, level, stockpile.rations, catalog)?;
        let cost = catalog.unit_u64(kind, level, attr::TRAINING_COST)?;
        let time = catalog.unit(kind, level, attr::TRAINING_TIME)?;
        stockpile.spend(ResourceKind::Rations, cost)?;

        let position = u32::try_from(self.queue_len() + 1).unwrap_or(u32::MAX);
        self.units.push(AttackUnit {
            id,
            home: UnitHome::Barrack(status.id),
            level,
            variant: UnitVariant::new(kind),
            seconds_since_last_feed: Fixed::ZERO,
            training_pos: Some(position),
            training_time_left: time,
        });
        tracing::debug!(barrack = %status.id, unit = %id, %kind, level, position, "Unit queued");
        Ok(id)
    }

    /// Raise the level new units of `kind` are trained at.
    ///
    /// Costs the next level's `upgrade_cost` in materials. Returns the new
    /// level.
    pub fn upgrade_unit_type(
        &mut self,
        kind: UnitKind,
        stockpile: &mut Stockpile,
        catalog: &PropertyCatalog,
    ) -> Result<u32> {
        let current = *self.unit_levels.get(kind);
        let max_level = catalog.max_level(Category::Unit, kind.catalog_name())?;
        if current >= max_level {
            return Err(GameError::MaxLevelReached(max_level));
        }
        let next = current + 1;
        let cost = catalog.unit_u64(kind, next, attr::UPGRADE_COST)?;
        stockpile.spend(ResourceKind::Materials, cost)?;
        *self.unit_levels.get_mut(kind) = next;
        Ok(next)
    }

    /// Which unit types the training UI should grey out.
    ///
    /// Side-effect free.
    pub fn disabled_units(
        &self,
        status: BuildingStatus,
        rations: u64,
        catalog: &PropertyCatalog,
    ) -> Result<DisabledUnits> {
        let taken = self.space_taken(catalog)?;
        let headroom = Self::max_capacity(status.level, catalog)?.saturating_sub(taken);
        PerUnitKind::try_from_fn(|kind| {
            let size = catalog.unit_size(kind)?;
            let cost = catalog.unit_u64(kind, *self.unit_levels.get(kind), attr::TRAINING_COST)?;
            Ok(status.under_construction
                || headroom < size
                || rations < cost
                || status.level < kind.unlock_level())
        })
    }

    /// Whether a unit of `size` fits with room to spare.
    ///
    /// Strict comparison: a ship only drops a unit where
    /// `taken + size < max_capacity`.
    pub fn has_room_for(&self, level: u32, size: u32, catalog: &PropertyCatalog) -> Result<bool> {
        Ok(self.space_taken(catalog)?.saturating_add(size) < Self::max_capacity(level, catalog)?)
    }

    /// Remove a unit, closing any gap it leaves in the queue.
    pub fn take_unit(&mut self, id: UnitId) -> Option<AttackUnit> {
        let index = self.units.iter().position(|u| u.id == id)?;
        let unit = self.units.remove(index);
        if let Some(gone) = unit.training_pos {
            for other in &mut self.units {
                if let Some(pos) = other.training_pos.as_mut() {
                    if *pos > gone {
                        *pos -= 1;
                    }
                }
            }
        }
        Some(unit)
    }

    /// Garrison a trained unit here.
    pub fn receive_unit(&mut self, building: BuildingId, mut unit: AttackUnit) {
        unit.home = UnitHome::Barrack(building);
        self.units.push(unit);
    }

    fn charge_upkeep(
        &mut self,
        status: BuildingStatus,
        elapsed: Seconds,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<()> {
        let mut index = 0;
        while index < self.units.len() {
            let unit = &mut self.units[index];
            if unit.is_training() {
                index += 1;
                continue;
            }
            let per_hour = unit.rations_per_hour(ctx.catalog)?;
            match unit.feed(elapsed, per_hour, ctx.stockpile) {
                Upkeep::Fed { .. } => index += 1,
                Upkeep::Starved { .. } => {
                    let dead = self.units.remove(index);
                    tracing::debug!(barrack = %status.id, unit = %dead.id, kind = %dead.kind(), "Unit starved");
                    ctx.events.push(SimEvent::UnitStarved {
                        barrack: status.id,
                        unit: dead.id,
                        kind: dead.kind(),
                    });
                }
            }
        }
        Ok(())
    }

    fn progress_training(
        &mut self,
        status: BuildingStatus,
        elapsed: Seconds,
        events: &mut Vec<SimEvent>,
    ) {
        let mut remaining = elapsed;
        while let Some(head) = self.units.iter().position(|u| u.training_pos == Some(1)) {
            let time_left = self.units[head].training_time_left;
            if time_left > remaining {
                self.units[head].training_time_left = time_left - remaining;
                break;
            }
            remaining -= time_left;

            let unit = &mut self.units[head];
            unit.training_pos = None;
            unit.training_time_left = Fixed::ZERO;
            let (id, kind) = (unit.id, unit.kind());

            for other in &mut self.units {
                if let Some(pos) = other.training_pos.as_mut() {
                    *pos -= 1;
                }
            }
            tracing::debug!(barrack = %status.id, unit = %id, %kind, "Unit trained");
            events.push(SimEvent::UnitTrained {
                barrack: status.id,
                unit: id,
                kind,
            });
        }
    }
}

impl Facility for Barrack {
    fn advance(
        &mut self,
        status: BuildingStatus,
        elapsed: Seconds,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<()> {
        self.charge_upkeep(status, elapsed, ctx)?;
        self.progress_training(status, elapsed, ctx.events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(level: u32) -> BuildingStatus {
        BuildingStatus {
            id: BuildingId::new(10),
            kind: BuildingKind::Barrack,
            level,
            under_construction: false,
        }
    }

    fn catalog() -> PropertyCatalog {
        PropertyCatalog::builtin().unwrap()
    }

    fn advance(
        barrack: &mut Barrack,
        level: u32,
        secs: i64,
        stock: &mut Stockpile,
    ) -> Vec<SimEvent> {
        let catalog = catalog();
        let mut events = Vec::new();
        let mut ctx = UpdateContext {
            catalog: &catalog,
            stockpile: stock,
            events: &mut events,
        };
        barrack
            .advance(status(level), Fixed::from_num(secs), &mut ctx)
            .unwrap();
        events
    }

    fn train(barrack: &mut Barrack, level: u32, id: u64, kind: UnitKind, stock: &mut Stockpile) -> Result<UnitId> {
        let unit_level = *barrack.unit_levels.get(kind);
        barrack.train_unit(status(level), UnitId::new(id), kind, unit_level, stock, &catalog())
    }

    fn positions(barrack: &Barrack) -> Vec<u32> {
        let mut p: Vec<u32> = barrack.units.iter().filter_map(|u| u.training_pos).collect();
        p.sort_unstable();
        p
    }

    #[test]
    fn test_train_marine_scenario() {
        let mut barrack = Barrack::new();
        let mut stock = Stockpile::new(1000, 0);
        train(&mut barrack, 1, 1, UnitKind::SpaceMarine, &mut stock).unwrap();
        assert_eq!(stock.rations, 990);

        let unit = barrack.unit(UnitId::new(1)).unwrap();
        assert_eq!(unit.training_time_left, Fixed::from_num(60));
        assert_eq!(unit.training_pos, Some(1));

        let events = advance(&mut barrack, 1, 60, &mut stock);
        let unit = barrack.unit(UnitId::new(1)).unwrap();
        assert_eq!(unit.training_pos, None);
        assert_eq!(unit.training_time_left, Fixed::ZERO);
        assert!(matches!(events[0], SimEvent::UnitTrained { .. }));
    }

    #[test]
    fn test_queue_slides_and_carries_leftover() {
        let mut barrack = Barrack::new();
        let mut stock = Stockpile::new(1000, 0);
        for id in 1..=3 {
            train(&mut barrack, 1, id, UnitKind::SpaceMarine, &mut stock).unwrap();
        }
        assert_eq!(positions(&barrack), vec![1, 2, 3]);

        // 60 + 60 finish two; 10 more goes into the third
        let events = advance(&mut barrack, 1, 130, &mut stock);
        assert_eq!(events.len(), 2);
        let third = barrack.unit(UnitId::new(3)).unwrap();
        assert_eq!(third.training_pos, Some(1));
        assert_eq!(third.training_time_left, Fixed::from_num(50));
        assert_eq!(positions(&barrack), vec![1]);
    }

    #[test]
    fn test_can_train_rejection_order() {
        let catalog = catalog();
        let barrack = Barrack::new();

        let err = barrack
            .can_train(status(1), UnitKind::SpaceMarine, 2, 1000, &catalog)
            .unwrap_err();
        assert!(matches!(err, GameError::UnitLevelMismatch { .. }));

        let mut building = status(1);
        building.under_construction = true;
        let err = barrack
            .can_train(building, UnitKind::SpaceMarine, 1, 0, &catalog)
            .unwrap_err();
        assert_eq!(err, GameError::UnderConstruction(building.id));

        // Drone is size 20 > capacity 10: storage fails before the lock check
        let err = barrack
            .can_train(status(1), UnitKind::SpaceDrone, 1, 0, &catalog)
            .unwrap_err();
        assert!(matches!(err, GameError::BarrackFull { .. }));

        let err = barrack
            .can_train(status(1), UnitKind::SpaceCommando, 1, 39, &catalog)
            .unwrap_err();
        assert!(matches!(err, GameError::InsufficientResources { .. }));

        let err = barrack
            .can_train(status(1), UnitKind::SpaceCommando, 1, 40, &catalog)
            .unwrap_err();
        assert_eq!(
            err,
            GameError::UnitLocked {
                kind: UnitKind::SpaceCommando,
                required: 2
            }
        );
        barrack
            .can_train(status(2), UnitKind::SpaceCommando, 1, 40, &catalog)
            .unwrap();
    }

    #[test]
    fn test_capacity_limit() {
        let mut barrack = Barrack::new();
        let mut stock = Stockpile::new(1000, 0);
        // 3 marines take 9 of 10
        for id in 1..=3 {
            train(&mut barrack, 1, id, UnitKind::SpaceMarine, &mut stock).unwrap();
        }
        let err = train(&mut barrack, 1, 4, UnitKind::SpaceMarine, &mut stock).unwrap_err();
        assert!(matches!(err, GameError::BarrackFull { taken: 9, capacity: 10, size: 3 }));
        assert_eq!(stock.rations, 970);
    }

    #[test]
    fn test_queue_depth_limit() {
        let mut barrack = Barrack::new();
        let mut stock = Stockpile::new(10_000, 0);
        // Level 3 holds 20: five marines fit (15)
        for id in 1..=5 {
            train(&mut barrack, 3, id, UnitKind::SpaceMarine, &mut stock).unwrap();
        }
        let err = train(&mut barrack, 3, 6, UnitKind::SpaceMarine, &mut stock).unwrap_err();
        assert_eq!(err, GameError::QueueFull(5));
    }

    #[test]
    fn test_upkeep_starves_in_order() {
        let mut barrack = Barrack::new();
        barrack.receive_unit(
            status(1).id,
            AttackUnit::trained(UnitId::new(1), UnitKind::SpaceMarine, 1, UnitHome::Barrack(status(1).id)),
        );
        barrack.receive_unit(
            status(1).id,
            AttackUnit::trained(UnitId::new(2), UnitKind::SpaceMarine, 1, UnitHome::Barrack(status(1).id)),
        );
        let mut stock = Stockpile::new(10, 0);
        let events = advance(&mut barrack, 1, 10 * 3600, &mut stock);
        assert!(barrack.units.is_empty());
        assert_eq!(stock.rations, 0);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_training_units_pay_no_upkeep() {
        let mut barrack = Barrack::new();
        let mut stock = Stockpile::new(10_000, 0);
        barrack
            .train_unit(status(3), UnitId::new(1), UnitKind::SpaceDrone, 1, &mut stock, &catalog())
            .unwrap();
        let after_cost = stock.rations;
        // Drone trains for 1800 s; the remaining 1800 s of this hour don't count
        advance(&mut barrack, 3, 3600, &mut stock);
        assert_eq!(stock.rations, after_cost);
        assert!(!barrack.units[0].is_training());
    }

    #[test]
    fn test_upgrade_unit_type() {
        let catalog = catalog();
        let mut barrack = Barrack::new();
        let mut stock = Stockpile::new(0, 300);
        assert_eq!(
            barrack
                .upgrade_unit_type(UnitKind::SpaceMarine, &mut stock, &catalog)
                .unwrap(),
            2
        );
        assert_eq!(stock.materials, 50);
        let err = barrack
            .upgrade_unit_type(UnitKind::SpaceMarine, &mut stock, &catalog)
            .unwrap_err();
        assert!(matches!(err, GameError::InsufficientResources { .. }));
        assert_eq!(*barrack.unit_levels.get(UnitKind::SpaceMarine), 2);
    }

    #[test]
    fn test_disabled_units() {
        let catalog = catalog();
        let barrack = Barrack::new();
        let flags = barrack.disabled_units(status(1), 1000, &catalog).unwrap();
        assert!(!flags.space_marine);
        assert!(flags.space_commando);
        assert!(flags.space_drone);

        let flags = barrack.disabled_units(status(3), 1000, &catalog).unwrap();
        assert!(!flags.space_commando);
        assert!(!flags.space_drone);

        let flags = barrack.disabled_units(status(3), 5, &catalog).unwrap();
        assert!(flags.space_marine);
    }

    #[test]
    fn test_take_unit_closes_queue_gap() {
        let mut barrack = Barrack::new();
        let mut stock = Stockpile::new(1000, 0);
        for id in 1..=3 {
            train(&mut barrack, 1, id, UnitKind::SpaceMarine, &mut stock).unwrap();
        }
        barrack.take_unit(UnitId::new(2)).unwrap();
        assert_eq!(positions(&barrack), vec![1, 2]);
        assert_eq!(barrack.unit(UnitId::new(3)).unwrap().training_pos, Some(2));
    }

    #[test]
    fn test_zero_delta_is_noop() {
        let mut barrack = Barrack::new();
        let mut stock = Stockpile::new(1000, 0);
        train(&mut barrack, 1, 1, UnitKind::SpaceMarine, &mut stock).unwrap();
        let before = barrack.clone();
        let stock_before = stock;
        assert!(advance(&mut barrack, 1, 0, &mut stock).is_empty());
        assert_eq!(barrack, before);
        assert_eq!(stock, stock_before);
    }
}
