//! Attack units and their combat passives.
//!
//! Every unit shares the [`AttackUnit`] record; the type-specific part lives
//! in [`UnitVariant`]. Round resolution is dispatched through the
//! [`CombatPassive`] trait, implemented once per variant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{attr, PropertyCatalog};
use crate::components::{BuildingId, ShipId, Stockpile, UnitId};
use crate::dice::Dice;
use crate::error::Result;
use crate::math::{fixed_serde, Fixed, Seconds, SECONDS_PER_HOUR};

/// Chance (out of 100) a commando turns a lost or tied round into a win.
pub const COMMANDO_AMBUSH_CHANCE: u32 = 5;
/// Chance (out of 100) a surviving drone fails anyway.
pub const DRONE_ENGINE_FAILURE_CHANCE: u32 = 5;
/// Chance (out of 100) a destroyed drone takes its opponent with it.
pub const DRONE_EXPLOSION_CHANCE: u32 = 25;
/// Attack power a marine gains for every two rounds fought.
pub const MARINE_VETERANCY_BONUS: u32 = 10;

// ============================================================================
// Unit kinds
// ============================================================================

/// The trainable unit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Cheap infantry that grows stronger the more rounds it fights.
    SpaceMarine,
    /// Elite infantry with a small chance to win any round.
    SpaceCommando,
    /// Heavy unit that may fail on its own or explode on death.
    SpaceDrone,
}

impl UnitKind {
    /// All unit kinds, in unlock order.
    pub const ALL: [Self; 3] = [Self::SpaceMarine, Self::SpaceCommando, Self::SpaceDrone];

    /// Catalog type name.
    #[must_use]
    pub const fn catalog_name(self) -> &'static str {
        match self {
            Self::SpaceMarine => "space_marine",
            Self::SpaceCommando => "space_commando",
            Self::SpaceDrone => "space_drone",
        }
    }

    /// Barrack level needed to train this kind.
    #[must_use]
    pub const fn unlock_level(self) -> u32 {
        match self {
            Self::SpaceMarine => 1,
            Self::SpaceCommando => 2,
            Self::SpaceDrone => 3,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.catalog_name())
    }
}

/// One value per unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PerUnitKind<T> {
    /// Space marine value.
    pub space_marine: T,
    /// Space commando value.
    pub space_commando: T,
    /// Space drone value.
    pub space_drone: T,
}

impl<T> PerUnitKind<T> {
    /// Same value for every kind.
    pub fn splat(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            space_marine: value.clone(),
            space_commando: value.clone(),
            space_drone: value,
        }
    }

    /// Build from a function of the kind.
    pub fn from_fn(mut f: impl FnMut(UnitKind) -> T) -> Self {
        Self {
            space_marine: f(UnitKind::SpaceMarine),
            space_commando: f(UnitKind::SpaceCommando),
            space_drone: f(UnitKind::SpaceDrone),
        }
    }

    /// Fallible [`from_fn`](Self::from_fn).
    pub fn try_from_fn<E>(mut f: impl FnMut(UnitKind) -> std::result::Result<T, E>) -> std::result::Result<Self, E> {
        Ok(Self {
            space_marine: f(UnitKind::SpaceMarine)?,
            space_commando: f(UnitKind::SpaceCommando)?,
            space_drone: f(UnitKind::SpaceDrone)?,
        })
    }

    /// Value for `kind`.
    pub const fn get(&self, kind: UnitKind) -> &T {
        match kind {
            UnitKind::SpaceMarine => &self.space_marine,
            UnitKind::SpaceCommando => &self.space_commando,
            UnitKind::SpaceDrone => &self.space_drone,
        }
    }

    /// Mutable value for `kind`.
    pub fn get_mut(&mut self, kind: UnitKind) -> &mut T {
        match kind {
            UnitKind::SpaceMarine => &mut self.space_marine,
            UnitKind::SpaceCommando => &mut self.space_commando,
            UnitKind::SpaceDrone => &mut self.space_drone,
        }
    }
}

// ============================================================================
// Round results and passives
// ============================================================================

/// One unit's view of a combat round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Whether this unit lives.
    pub self_survives: bool,
    /// Whether this unit thinks its opponent lives.
    pub enemy_survives: bool,
    /// Whether the unit's passive changed or marked the outcome.
    pub passive_triggered: bool,
}

impl RoundOutcome {
    /// Plain roll comparison: strictly higher survives, a tie kills both.
    #[must_use]
    pub const fn compare(own_roll: u32, enemy_roll: u32) -> Self {
        Self {
            self_survives: own_roll > enemy_roll,
            enemy_survives: enemy_roll > own_roll,
            passive_triggered: false,
        }
    }

    /// Whether this is an outright win: self alive, enemy dead.
    #[must_use]
    pub const fn is_win(&self) -> bool {
        self.self_survives && !self.enemy_survives
    }
}

/// Type-specific combat behaviour.
pub trait CombatPassive {
    /// Resolve a round from this unit's perspective.
    fn round_result(&mut self, own_roll: u32, enemy_roll: u32, dice: &mut dyn Dice)
        -> RoundOutcome;

    /// Extra attack power on top of the catalog value.
    fn attack_bonus(&self) -> u32 {
        0
    }
}

/// Marine state: counts rounds fought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Marine {
    /// Rounds this marine has taken part in.
    ///
    /// Counted before the outcome is known, so a marine that dies still
    /// counts its last round.
    pub combats_survived: u32,
}

impl CombatPassive for Marine {
    fn round_result(
        &mut self,
        own_roll: u32,
        enemy_roll: u32,
        _dice: &mut dyn Dice,
    ) -> RoundOutcome {
        self.combats_survived += 1;
        let mut outcome = RoundOutcome::compare(own_roll, enemy_roll);
        outcome.passive_triggered = outcome.self_survives;
        outcome
    }

    fn attack_bonus(&self) -> u32 {
        MARINE_VETERANCY_BONUS * (self.combats_survived / 2)
    }
}

/// Commando state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Commando;

impl CombatPassive for Commando {
    fn round_result(&mut self, own_roll: u32, enemy_roll: u32, dice: &mut dyn Dice) -> RoundOutcome {
        let outcome = RoundOutcome::compare(own_roll, enemy_roll);
        if !outcome.is_win() && dice.chance(COMMANDO_AMBUSH_CHANCE) {
            return RoundOutcome {
                self_survives: true,
                enemy_survives: false,
                passive_triggered: true,
            };
        }
        outcome
    }
}

/// Drone state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Drone;

impl CombatPassive for Drone {
    fn round_result(&mut self, own_roll: u32, enemy_roll: u32, dice: &mut dyn Dice) -> RoundOutcome {
        let mut outcome = RoundOutcome::compare(own_roll, enemy_roll);
        if outcome.self_survives && dice.chance(DRONE_ENGINE_FAILURE_CHANCE) {
            outcome.self_survives = false;
            outcome.passive_triggered = true;
        }
        if !outcome.self_survives && outcome.enemy_survives && dice.chance(DRONE_EXPLOSION_CHANCE) {
            outcome.enemy_survives = false;
            outcome.passive_triggered = true;
        }
        outcome
    }
}

/// Type-specific part of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitVariant {
    /// A space marine.
    SpaceMarine(Marine),
    /// A space commando.
    SpaceCommando(Commando),
    /// A space drone.
    SpaceDrone(Drone),
}

impl UnitVariant {
    /// Fresh state for a newly trained unit.
    #[must_use]
    pub const fn new(kind: UnitKind) -> Self {
        match kind {
            UnitKind::SpaceMarine => Self::SpaceMarine(Marine { combats_survived: 0 }),
            UnitKind::SpaceCommando => Self::SpaceCommando(Commando),
            UnitKind::SpaceDrone => Self::SpaceDrone(Drone),
        }
    }

    /// The kind this variant belongs to.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        match self {
            Self::SpaceMarine(_) => UnitKind::SpaceMarine,
            Self::SpaceCommando(_) => UnitKind::SpaceCommando,
            Self::SpaceDrone(_) => UnitKind::SpaceDrone,
        }
    }

    fn passive(&self) -> &dyn CombatPassive {
        match self {
            Self::SpaceMarine(m) => m,
            Self::SpaceCommando(c) => c,
            Self::SpaceDrone(d) => d,
        }
    }

    fn passive_mut(&mut self) -> &mut dyn CombatPassive {
        match self {
            Self::SpaceMarine(m) => m,
            Self::SpaceCommando(c) => c,
            Self::SpaceDrone(d) => d,
        }
    }
}

// ============================================================================
// Attack unit
// ============================================================================

/// Where a unit currently lives. A unit is garrisoned or aboard, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitHome {
    /// Stored in (or training at) a barrack.
    Barrack(BuildingId),
    /// Boarded on a spaceship.
    Spaceship(ShipId),
}

/// Result of charging upkeep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upkeep {
    /// All due hours were paid.
    Fed {
        /// Rations charged.
        paid: u64,
    },
    /// The planet ran out; the unit starved.
    Starved {
        /// Rations charged before running out.
        paid: u64,
    },
}

/// A trainable, combat-capable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackUnit {
    /// Unique id.
    pub id: UnitId,
    /// Owning barrack or spaceship.
    pub home: UnitHome,
    /// Level the unit was trained at.
    pub level: u32,
    /// Type-specific state.
    pub variant: UnitVariant,
    /// Seconds accrued towards the next upkeep payment.
    #[serde(with = "fixed_serde")]
    pub seconds_since_last_feed: Seconds,
    /// 1-based queue slot while training.
    pub training_pos: Option<u32>,
    /// Seconds of training left; zero once trained.
    #[serde(with = "fixed_serde")]
    pub training_time_left: Seconds,
}

impl AttackUnit {
    /// A unit that has finished training.
    #[must_use]
    pub fn trained(id: UnitId, kind: UnitKind, level: u32, home: UnitHome) -> Self {
        Self {
            id,
            home,
            level,
            variant: UnitVariant::new(kind),
            seconds_since_last_feed: Fixed::ZERO,
            training_pos: None,
            training_time_left: Fixed::ZERO,
        }
    }

    /// Unit type.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.variant.kind()
    }

    /// Whether the unit is still in a training queue.
    #[must_use]
    pub const fn is_training(&self) -> bool {
        self.training_pos.is_some()
    }

    /// Rounds fought, for marines.
    #[must_use]
    pub const fn combats_survived(&self) -> Option<u32> {
        match self.variant {
            UnitVariant::SpaceMarine(m) => Some(m.combats_survived),
            _ => None,
        }
    }

    /// Space the unit occupies.
    pub fn size(&self, catalog: &PropertyCatalog) -> Result<u32> {
        catalog.unit_size(self.kind())
    }

    /// Catalog attack power plus the variant bonus.
    pub fn attack_power(&self, catalog: &PropertyCatalog) -> Result<u32> {
        let base = catalog
            .unit(self.kind(), self.level, attr::ATTACK_POWER)?
            .saturating_to_num::<u32>();
        Ok(base.saturating_add(self.variant.passive().attack_bonus()))
    }

    /// Upkeep per hour.
    pub fn rations_per_hour(&self, catalog: &PropertyCatalog) -> Result<u64> {
        catalog.unit_u64(self.kind(), self.level, attr::RATIONS_PER_HOUR)
    }

    /// Uniform roll in `0..=attack_power`.
    pub fn roll_dice(&self, catalog: &PropertyCatalog, dice: &mut dyn Dice) -> Result<u32> {
        Ok(dice.roll(self.attack_power(catalog)?))
    }

    /// Resolve a round from this unit's perspective.
    pub fn round_result(&mut self, own_roll: u32, enemy_roll: u32, dice: &mut dyn Dice) -> RoundOutcome {
        self.variant
            .passive_mut()
            .round_result(own_roll, enemy_roll, dice)
    }

    /// Accrue `elapsed` and pay every full hour from `stockpile`.
    ///
    /// When an hour cannot be paid the planet's rations are zeroed and the
    /// unit starves; no partial hour is charged.
    pub fn feed(&mut self, elapsed: Seconds, rations_per_hour: u64, stockpile: &mut Stockpile) -> Upkeep {
        let hour = Fixed::from_num(SECONDS_PER_HOUR);
        self.seconds_since_last_feed = self.seconds_since_last_feed.saturating_add(elapsed);

        let mut paid = 0;
        while self.seconds_since_last_feed >= hour {
            if stockpile.rations < rations_per_hour {
                stockpile.rations = 0;
                return Upkeep::Starved { paid };
            }
            stockpile.rations -= rations_per_hour;
            paid += rations_per_hour;
            self.seconds_since_last_feed -= hour;
        }
        Upkeep::Fed { paid }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::SequenceDice;

    fn marine() -> AttackUnit {
        AttackUnit::trained(
            UnitId::new(1),
            UnitKind::SpaceMarine,
            1,
            UnitHome::Barrack(BuildingId::new(9)),
        )
    }

    #[test]
    fn test_base_comparison() {
        assert_eq!(
            RoundOutcome::compare(5, 3),
            RoundOutcome {
                self_survives: true,
                enemy_survives: false,
                passive_triggered: false
            }
        );
        let tie = RoundOutcome::compare(4, 4);
        assert!(!tie.self_survives && !tie.enemy_survives);
        let loss = RoundOutcome::compare(1, 3);
        assert!(!loss.self_survives && loss.enemy_survives);
    }

    #[test]
    fn test_marine_counts_every_round() {
        let mut unit = marine();
        let mut dice = SequenceDice::new(Vec::<u32>::new());

        let won = unit.round_result(5, 3, &mut dice);
        assert!(won.is_win() && won.passive_triggered);

        // Counted even though this round is lost
        let lost = unit.round_result(1, 3, &mut dice);
        assert!(!lost.self_survives && !lost.passive_triggered);
        assert_eq!(unit.combats_survived(), Some(2));
    }

    #[test]
    fn test_marine_veterancy_bonus() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut unit = marine();
        let mut dice = SequenceDice::new(Vec::<u32>::new());
        assert_eq!(unit.attack_power(&catalog).unwrap(), 10);
        unit.round_result(1, 0, &mut dice);
        assert_eq!(unit.attack_power(&catalog).unwrap(), 10);
        unit.round_result(1, 0, &mut dice);
        assert_eq!(unit.attack_power(&catalog).unwrap(), 20);
        for _ in 0..3 {
            unit.round_result(1, 0, &mut dice);
        }
        assert_eq!(unit.attack_power(&catalog).unwrap(), 30);
    }

    #[test]
    fn test_commando_ambush_overrides_loss() {
        let mut commando = Commando;
        let mut dice = SequenceDice::new([5]);
        let outcome = commando.round_result(0, 10, &mut dice);
        assert_eq!(
            outcome,
            RoundOutcome {
                self_survives: true,
                enemy_survives: false,
                passive_triggered: true
            }
        );
    }

    #[test]
    fn test_commando_no_ambush_on_high_roll() {
        let mut commando = Commando;
        let mut dice = SequenceDice::new([6]);
        let outcome = commando.round_result(3, 3, &mut dice);
        assert!(!outcome.self_survives && !outcome.enemy_survives);
        assert!(!outcome.passive_triggered);
    }

    #[test]
    fn test_commando_win_consumes_no_roll() {
        let mut commando = Commando;
        let mut dice = SequenceDice::new([0]);
        let outcome = commando.round_result(9, 3, &mut dice);
        assert!(outcome.is_win() && !outcome.passive_triggered);
        assert_eq!(dice.remaining(), 1);
    }

    #[test]
    fn test_drone_engine_failure_then_explosion() {
        let mut drone = Drone;
        // Survives the comparison, engine fails (<= 5), then enemy is alive and dies (<= 25)
        let mut dice = SequenceDice::new([3, 20]);
        let outcome = drone.round_result(10, 2, &mut dice);
        // Enemy already dead from the comparison: the explosion check doesn't apply
        assert!(!outcome.self_survives && !outcome.enemy_survives);
        assert!(outcome.passive_triggered);
        assert_eq!(dice.remaining(), 1);
    }

    #[test]
    fn test_drone_explodes_on_loss() {
        let mut drone = Drone;
        let mut dice = SequenceDice::new([25]);
        let outcome = drone.round_result(1, 9, &mut dice);
        assert!(!outcome.self_survives && !outcome.enemy_survives);
        assert!(outcome.passive_triggered);
    }

    #[test]
    fn test_drone_loses_plainly() {
        let mut drone = Drone;
        let mut dice = SequenceDice::new([26]);
        let outcome = drone.round_result(1, 9, &mut dice);
        assert!(!outcome.self_survives && outcome.enemy_survives);
        assert!(!outcome.passive_triggered);
    }

    #[test]
    fn test_feed_pays_whole_hours_only() {
        let mut unit = marine();
        let mut stock = Stockpile::new(100, 0);
        let paid = unit.feed(Fixed::from_num(2 * 3600 + 1800), 3, &mut stock);
        assert_eq!(paid, Upkeep::Fed { paid: 6 });
        assert_eq!(stock.rations, 94);
        assert_eq!(unit.seconds_since_last_feed, Fixed::from_num(1800));
    }

    #[test]
    fn test_feed_starves_and_zeroes_rations() {
        let mut unit = marine();
        let mut stock = Stockpile::new(10, 0);
        let result = unit.feed(Fixed::from_num(10 * 3600), 3, &mut stock);
        assert_eq!(result, Upkeep::Starved { paid: 9 });
        assert_eq!(stock.rations, 0);
    }

    #[test]
    fn test_roll_dice_bounded_by_attack_power() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let unit = marine();
        let mut dice = SequenceDice::new([1000]);
        assert_eq!(unit.roll_dice(&catalog, &mut dice).unwrap(), 10);
    }
}
