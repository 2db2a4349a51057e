//! Round-based combat between two planets.
//!
//! An [`Attack`] pairs an attacking and a defending planet. Each round one
//! selected unit per side rolls against the other; both units then judge the
//! same pair of rolls through their passives. A unit only lives if it thinks
//! it survived *and* its opponent thinks it survived, so passives on either
//! side can kill. The battle ends when a side has no trained units left.

use serde::{Deserialize, Serialize};

use crate::catalog::PropertyCatalog;
use crate::components::{AttackId, PlanetId, Stockpile, UnitId};
use crate::dice::Dice;
use crate::error::{GameError, Result};
use crate::planet::Planet;
use crate::units::{RoundOutcome, UnitKind};

/// Share of the defender's resources taken on a win, in percent.
pub const PLUNDER_PERCENT: u64 = 25;
/// Share of the attacker's resources kept after losing, in percent.
pub const RETREAT_KEEP_PERCENT: u64 = 90;

/// An ongoing battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    /// Unique id.
    pub id: AttackId,
    /// Attacking planet.
    pub attacker: PlanetId,
    /// Defending planet.
    pub defender: PlanetId,
    /// Unit the attacker sends into the next round.
    pub selected_attack_unit: Option<UnitId>,
    /// Unit the defender sends into the next round.
    pub selected_defence_unit: Option<UnitId>,
}

impl Attack {
    /// A fresh battle with nothing selected.
    #[must_use]
    pub const fn new(id: AttackId, attacker: PlanetId, defender: PlanetId) -> Self {
        Self {
            id,
            attacker,
            defender,
            selected_attack_unit: None,
            selected_defence_unit: None,
        }
    }

    /// Drop any selection pointing at `unit`.
    pub fn forget_unit(&mut self, unit: UnitId) {
        if self.selected_attack_unit == Some(unit) {
            self.selected_attack_unit = None;
        }
        if self.selected_defence_unit == Some(unit) {
            self.selected_defence_unit = None;
        }
    }
}

/// How a side's unit is chosen when nothing valid is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutoSelect {
    /// Require an explicit selection.
    #[default]
    Off,
    /// Highest attack power among all trained units.
    Strongest,
    /// Highest attack power among trained units of one type.
    StrongestOf(UnitKind),
}

impl AutoSelect {
    const fn filter(self) -> Option<Option<UnitKind>> {
        match self {
            Self::Off => None,
            Self::Strongest => Some(None),
            Self::StrongestOf(kind) => Some(Some(kind)),
        }
    }
}

/// Per-round knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOptions {
    /// Attacker selection fallback.
    pub auto_select_attack: AutoSelect,
    /// Defender selection fallback.
    pub auto_select_defence: AutoSelect,
    /// Settle the battle inside the round that ends it.
    pub auto_conclude: bool,
}

impl Default for RoundOptions {
    fn default() -> Self {
        Self {
            auto_select_attack: AutoSelect::Off,
            auto_select_defence: AutoSelect::Strongest,
            auto_conclude: true,
        }
    }
}

/// How a finished battle went for the attacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Defender has no units left.
    Win,
    /// Attacker has no units left.
    Lose,
}

/// Everything that happened in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Attacking unit.
    pub attack_unit: UnitId,
    /// Defending unit.
    pub defence_unit: UnitId,
    /// Attacker's roll.
    pub attack_roll: u32,
    /// Defender's roll.
    pub defence_roll: u32,
    /// Whether the attacking unit lived.
    pub attack_survives: bool,
    /// Whether the defending unit lived.
    pub defence_survives: bool,
    /// Whether the attacker's passive fired.
    pub passive_attack: bool,
    /// Whether the defender's passive fired.
    pub passive_defence: bool,
    /// Set when this round ended the battle.
    pub outcome: Option<BattleOutcome>,
}

/// Resources moved by a battle conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Spoils {
    /// Rations moved.
    pub rations: u64,
    /// Materials moved.
    pub materials: u64,
}

fn percent_of(amount: u64, percent: u64) -> u64 {
    let scaled = u128::from(amount) * u128::from(percent) / 100;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Move a quarter of the defender's resources to the attacker.
///
/// Both amounts are computed before anything moves.
pub fn plunder(attacker: &mut Stockpile, defender: &mut Stockpile) -> Spoils {
    let spoils = Spoils {
        rations: percent_of(defender.rations, PLUNDER_PERCENT),
        materials: percent_of(defender.materials, PLUNDER_PERCENT),
    };
    defender.rations -= spoils.rations;
    defender.materials -= spoils.materials;
    attacker.rations = attacker.rations.saturating_add(spoils.rations);
    attacker.materials = attacker.materials.saturating_add(spoils.materials);
    spoils
}

/// Cut the attacker's resources to 90%, truncating. Returns what was lost.
pub fn retreat_penalty(attacker: &mut Stockpile) -> Spoils {
    let kept = Stockpile::new(
        percent_of(attacker.rations, RETREAT_KEEP_PERCENT),
        percent_of(attacker.materials, RETREAT_KEEP_PERCENT),
    );
    let lost = Spoils {
        rations: attacker.rations - kept.rations,
        materials: attacker.materials - kept.materials,
    };
    *attacker = kept;
    lost
}

/// Check that `unit` can fight for `planet`.
pub fn check_selectable(planet: &Planet, unit: UnitId) -> Result<()> {
    match planet.find_unit(unit) {
        None => Err(GameError::UnitNotFound(unit)),
        Some(u) if u.is_training() => Err(GameError::UnitUnavailable(unit)),
        Some(_) => Ok(()),
    }
}

fn pick_unit(
    planet: &Planet,
    selected: Option<UnitId>,
    auto: AutoSelect,
    side: &'static str,
    catalog: &PropertyCatalog,
) -> Result<UnitId> {
    // Auto-selection overrides any explicit choice
    if let Some(kind) = auto.filter() {
        return planet
            .strongest_unit(kind, catalog)?
            .ok_or(GameError::NoUnitSelected(side));
    }
    // A selection whose unit died or left counts as no selection
    selected
        .filter(|u| check_selectable(planet, *u).is_ok())
        .ok_or(GameError::NoUnitSelected(side))
}

fn fight(planet: &mut Planet, unit: UnitId, own_roll: u32, enemy_roll: u32, dice: &mut dyn Dice) -> Result<RoundOutcome> {
    let fighter = planet.unit_mut(unit).ok_or(GameError::UnitNotFound(unit))?;
    Ok(fighter.round_result(own_roll, enemy_roll, dice))
}

/// Play one round of `attack`.
///
/// Units are resolved (auto-selection when enabled, else the explicit
/// selection) before
/// anything changes, so a failed round leaves both planets untouched. Dead
/// units are removed from their barracks. The report's `outcome` is set when
/// a side ran out of trained units; settling it is up to the caller.
pub fn resolve_round(
    attack: &mut Attack,
    attacker: &mut Planet,
    defender: &mut Planet,
    options: RoundOptions,
    catalog: &PropertyCatalog,
    dice: &mut dyn Dice,
) -> Result<RoundReport> {
    let attack_unit = pick_unit(
        attacker,
        attack.selected_attack_unit,
        options.auto_select_attack,
        "attack",
        catalog,
    )?;
    let defence_unit = pick_unit(
        defender,
        attack.selected_defence_unit,
        options.auto_select_defence,
        "defence",
        catalog,
    )?;

    let attack_power = attacker
        .find_unit(attack_unit)
        .ok_or(GameError::UnitNotFound(attack_unit))?
        .attack_power(catalog)?;
    let defence_power = defender
        .find_unit(defence_unit)
        .ok_or(GameError::UnitNotFound(defence_unit))?
        .attack_power(catalog)?;

    attack.selected_attack_unit = Some(attack_unit);
    attack.selected_defence_unit = Some(defence_unit);

    let attack_roll = dice.roll(attack_power);
    let defence_roll = dice.roll(defence_power);
    let attack_view = fight(attacker, attack_unit, attack_roll, defence_roll, dice)?;
    let defence_view = fight(defender, defence_unit, defence_roll, attack_roll, dice)?;

    let attack_survives = attack_view.self_survives && defence_view.enemy_survives;
    let defence_survives = defence_view.self_survives && attack_view.enemy_survives;

    if !attack_survives {
        attacker.take_unit(attack_unit);
        attack.selected_attack_unit = None;
    }
    if !defence_survives {
        defender.take_unit(defence_unit);
        attack.selected_defence_unit = None;
    }

    let outcome = if attacker.living_units() == 0 {
        Some(BattleOutcome::Lose)
    } else if defender.living_units() == 0 {
        Some(BattleOutcome::Win)
    } else {
        None
    };

    tracing::debug!(
        attack = %attack.id,
        %attack_unit,
        %defence_unit,
        attack_roll,
        defence_roll,
        attack_survives,
        defence_survives,
        ?outcome,
        "Round played"
    );

    Ok(RoundReport {
        attack_unit,
        defence_unit,
        attack_roll,
        defence_roll,
        attack_survives,
        defence_survives,
        passive_attack: attack_view.passive_triggered,
        passive_defence: defence_view.passive_triggered,
        outcome,
    })
}
