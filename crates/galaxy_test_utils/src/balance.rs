//! Balance testing utilities for headless combat.
//!
//! Runs thousands of seeded battles between two armies to check that the
//! catalog's attack powers and the unit passives produce sensible matchups.

use galaxy_core::buildings::BuildingKind;
use galaxy_core::catalog::{attr, PropertyCatalog};
use galaxy_core::clock::Timestamp;
use galaxy_core::combat::{self, Attack, AutoSelect, BattleOutcome, RoundOptions};
use galaxy_core::components::{GridPos, IdAllocator, OwnerId, Stockpile};
use galaxy_core::dice::{Dice, RngDice};
use galaxy_core::error::Result;
use galaxy_core::math::{Coordinates, Fixed};
use galaxy_core::planet::{Planet, MAX_SETTLEMENTS};
use galaxy_core::units::{AttackUnit, UnitHome, UnitKind};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Rounds after which a battle is called a draw.
pub const MAX_ROUNDS: u32 = 1000;

/// Result of a simulated battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleResult {
    /// How it ended; `None` on timeout.
    pub outcome: Option<BattleOutcome>,
    /// Rounds played.
    pub rounds: u32,
    /// Attacking units left standing.
    pub attackers_left: usize,
    /// Defending units left standing.
    pub defenders_left: usize,
}

/// Statistics for a set of battles.
#[derive(Debug, Clone, Default)]
pub struct BattleStats {
    /// Total battles run.
    pub total_battles: u32,
    /// Battles the attacker won.
    pub attacker_wins: u32,
    /// Battles the attacker lost, including mutual wipe-outs.
    pub defender_wins: u32,
    /// Battles that hit [`MAX_ROUNDS`].
    pub draws: u32,
    /// Average rounds to resolution.
    pub avg_rounds: f64,
}

impl BattleStats {
    /// Fraction of battles the attacker won (0.0 to 1.0).
    pub fn attacker_win_rate(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.attacker_wins) / f64::from(self.total_battles)
    }

    /// Check if the matchup is balanced (within acceptable range).
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.attacker_win_rate();
        rate >= min_rate && rate <= max_rate
    }
}

/// A planet garrisoned with one trained level-1 unit per barrack.
///
/// # Errors
///
/// Catalog lookups for the barracks.
///
/// # Panics
///
/// Panics if the army does not fit on one settlement grid.
pub fn garrisoned_planet(
    ids: &mut IdAllocator,
    owner: u64,
    army: &[UnitKind],
    catalog: &PropertyCatalog,
) -> Result<Planet> {
    assert!(army.len() <= 24, "one barrack per unit, 24 free slots");
    let mut planet = Planet::new(
        ids.next(),
        OwnerId::new(owner),
        "Arena",
        Coordinates::new(0, 0),
        Stockpile::new(0, 1_000_000),
        Timestamp::ZERO,
    );
    let settlement = planet.found_settlement(MAX_SETTLEMENTS, ids)?;
    let slots = (0u8..5).flat_map(|y| (0u8..5).map(move |x| GridPos::new(x, y)));
    for (kind, slot) in army.iter().zip(slots) {
        let barrack = planet.build(settlement, BuildingKind::Barrack, slot, catalog, ids)?;
        let building = planet.building_mut(barrack)?;
        building.construction_time_left = Fixed::ZERO;
        building.level = 3;
        let unit = AttackUnit::trained(ids.next(), *kind, 1, UnitHome::Barrack(barrack));
        if let Some(b) = building.barrack_mut() {
            b.receive_unit(barrack, unit);
        }
    }
    Ok(planet)
}

/// Fight one battle to the end with both sides sending their strongest unit.
pub fn simulate_battle(
    attacker_army: &[UnitKind],
    defender_army: &[UnitKind],
    catalog: &PropertyCatalog,
    dice: &mut dyn Dice,
) -> Result<BattleResult> {
    let mut ids = IdAllocator::new();
    let mut attacker = garrisoned_planet(&mut ids, 1, attacker_army, catalog)?;
    let mut defender = garrisoned_planet(&mut ids, 2, defender_army, catalog)?;
    let mut attack = Attack::new(ids.next(), attacker.id, defender.id);
    let options = RoundOptions {
        auto_select_attack: AutoSelect::Strongest,
        auto_select_defence: AutoSelect::Strongest,
        auto_conclude: true,
    };

    let mut outcome = None;
    let mut rounds = 0;
    while outcome.is_none() && rounds < MAX_ROUNDS {
        if attacker.living_units() == 0 || defender.living_units() == 0 {
            outcome = Some(BattleOutcome::Lose);
            break;
        }
        let report = combat::resolve_round(&mut attack, &mut attacker, &mut defender, options, catalog, dice)?;
        rounds += 1;
        outcome = report.outcome;
    }

    Ok(BattleResult {
        outcome,
        rounds,
        attackers_left: attacker.living_units(),
        defenders_left: defender.living_units(),
    })
}

/// Run `battles` seeded battles of the same matchup.
pub fn run_battles(
    attacker_army: &[UnitKind],
    defender_army: &[UnitKind],
    battles: u32,
    seed: u64,
    catalog: &PropertyCatalog,
) -> Result<BattleStats> {
    let mut dice = RngDice(StdRng::seed_from_u64(seed));
    let mut stats = BattleStats::default();
    let mut total_rounds = 0u64;

    for _ in 0..battles {
        let result = simulate_battle(attacker_army, defender_army, catalog, &mut dice)?;
        stats.total_battles += 1;
        total_rounds += u64::from(result.rounds);
        match result.outcome {
            Some(BattleOutcome::Win) => stats.attacker_wins += 1,
            Some(BattleOutcome::Lose) => stats.defender_wins += 1,
            None => stats.draws += 1,
        }
    }
    if stats.total_battles > 0 {
        stats.avg_rounds = total_rounds as f64 / f64::from(stats.total_battles);
    }
    Ok(stats)
}

/// Chance that a roll in `0..=own` beats a roll in `0..=enemy`, before
/// passives.
pub fn round_win_chance(own: u32, enemy: u32) -> f64 {
    let own = u64::from(own);
    let enemy = u64::from(enemy);
    // For each own roll x, enemy rolls below x: min(x, enemy + 1) of them
    let beaten: u64 = (0..=own).map(|x| x.min(enemy + 1)).sum();
    beaten as f64 / ((own + 1) * (enemy + 1)) as f64
}

/// Round win chance for every level-1 matchup: (attacker, defender, chance).
pub fn round_win_matrix(catalog: &PropertyCatalog) -> Result<Vec<(UnitKind, UnitKind, f64)>> {
    let mut results = Vec::new();
    for attacker in UnitKind::ALL {
        let own = catalog.unit_u64(attacker, 1, attr::ATTACK_POWER)?;
        for defender in UnitKind::ALL {
            let enemy = catalog.unit_u64(defender, 1, attr::ATTACK_POWER)?;
            let chance = round_win_chance(
                u32::try_from(own).unwrap_or(u32::MAX),
                u32::try_from(enemy).unwrap_or(u32::MAX),
            );
            results.push((attacker, defender, chance));
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::catalog;

    #[test]
    fn test_round_win_chance_symmetric() {
        // 0..=10 vs 0..=10: 121 pairs, 11 ties, the rest split evenly
        let chance = round_win_chance(10, 10);
        assert!((chance - 55.0 / 121.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_win_chance_zero_power() {
        assert!(round_win_chance(0, 10).abs() < f64::EPSILON);
        assert!((round_win_chance(1, 0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_matrix_covers_every_matchup() {
        let matrix = round_win_matrix(&catalog()).unwrap();
        assert_eq!(matrix.len(), 9);
        let drone_v_marine = matrix
            .iter()
            .find(|(a, d, _)| *a == UnitKind::SpaceDrone && *d == UnitKind::SpaceMarine)
            .map(|(_, _, c)| *c)
            .unwrap();
        assert!(drone_v_marine > 0.9);
    }

    #[test]
    fn test_garrisoned_planet_units_are_ready() {
        let mut ids = IdAllocator::new();
        let army = [UnitKind::SpaceMarine, UnitKind::SpaceDrone];
        let planet = garrisoned_planet(&mut ids, 1, &army, &catalog()).unwrap();
        assert_eq!(planet.living_units(), 2);
        assert!(planet.garrison().all(|u| !u.is_training()));
    }

    #[test]
    fn test_battle_stats_add_up() {
        let stats = run_battles(
            &[UnitKind::SpaceMarine, UnitKind::SpaceMarine],
            &[UnitKind::SpaceMarine, UnitKind::SpaceMarine],
            50,
            3,
            &catalog(),
        )
        .unwrap();
        assert_eq!(stats.total_battles, 50);
        assert_eq!(stats.attacker_wins + stats.defender_wins + stats.draws, 50);
        assert!(stats.avg_rounds >= 1.0);
    }

    #[test]
    fn test_drone_dominates_marine() {
        let stats = run_battles(&[UnitKind::SpaceDrone], &[UnitKind::SpaceMarine], 200, 11, &catalog()).unwrap();
        assert!(
            stats.attacker_win_rate() > 0.8,
            "drone should win most duels, got {}",
            stats.attacker_win_rate()
        );
    }

    #[test]
    fn test_battles_are_reproducible() {
        let army = [UnitKind::SpaceCommando, UnitKind::SpaceMarine];
        let a = run_battles(&army, &army, 30, 99, &catalog()).unwrap();
        let b = run_battles(&army, &army, 30, 99, &catalog()).unwrap();
        assert_eq!(a.attacker_wins, b.attacker_wins);
        assert!((a.avg_rounds - b.avg_rounds).abs() < f64::EPSILON);
    }
}
