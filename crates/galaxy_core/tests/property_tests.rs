//! Property tests for the rules that must hold whatever players do.

use galaxy_core::buildings::BuildingKind;
use galaxy_core::combat::{self, Attack, AutoSelect, RoundOptions};
use galaxy_core::components::{GridPos, IdAllocator};
use galaxy_core::dice::SequenceDice;
use galaxy_core::training::Barrack;
use galaxy_core::units::UnitKind;
use galaxy_test_utils::balance::garrisoned_planet;
use galaxy_test_utils::determinism::strategies::{arb_rolls, arb_unit_kind, arb_wait_secs};
use galaxy_test_utils::fixtures::{catalog, World};
use proptest::prelude::*;

/// A world whose home planet has a finished barrack.
fn with_barrack() -> (World, galaxy_core::components::BuildingId) {
    let mut world = World::new();
    let home = world.home;
    let barrack = world.build_finished(home, BuildingKind::Barrack, GridPos::new(0, 0));
    (world, barrack)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Catching up to the time of the last catch-up changes nothing.
    #[test]
    fn prop_zero_delta_is_noop(
        orders in prop::collection::vec(arb_unit_kind(), 0..6),
        wait in arb_wait_secs(),
    ) {
        let (mut world, barrack) = with_barrack();
        let home = world.home;
        for kind in orders {
            let _ = world.galaxy.train_unit(home, barrack, kind, 1, &world.catalog);
        }
        world.wait(wait);
        let hash = world.galaxy.state_hash();
        let events = world.wait(0);
        prop_assert!(events.is_empty());
        prop_assert_eq!(world.galaxy.state_hash(), hash);
    }

    /// Barrack storage never exceeds its level's capacity, and the training
    /// queue stays dense and within depth.
    #[test]
    fn prop_barrack_capacity_and_queue(
        steps in prop::collection::vec((arb_unit_kind(), 0u64..200), 1..20),
    ) {
        let (mut world, barrack) = with_barrack();
        let home = world.home;
        for (kind, wait) in steps {
            let _ = world.galaxy.train_unit(home, barrack, kind, 1, &world.catalog);
            world.wait(wait);

            let building = world.galaxy.planet(home).unwrap().building(barrack).unwrap();
            let state = building.barrack().unwrap();
            let capacity = Barrack::max_capacity(building.level, &world.catalog).unwrap();
            prop_assert!(state.space_taken(&world.catalog).unwrap() <= capacity);

            let positions: Vec<u32> = state
                .training_queue()
                .iter()
                .filter_map(|u| u.training_pos)
                .collect();
            let expected: Vec<u32> = (1..).take(positions.len()).collect();
            prop_assert_eq!(positions, expected);
            prop_assert!(state.queue_len() <= galaxy_core::training::MAX_QUEUE_DEPTH);
        }
    }

    /// Without income, rations only ever go down while units are fed.
    #[test]
    fn prop_upkeep_never_creates_rations(
        marines in 1usize..4,
        waits in prop::collection::vec(arb_wait_secs(), 1..8),
    ) {
        let (mut world, barrack) = with_barrack();
        let home = world.home;
        world.train(home, barrack, UnitKind::SpaceMarine, marines);
        let mut last = world.galaxy.planet(home).unwrap().stockpile.rations;
        for wait in waits {
            world.wait(wait);
            let now = world.galaxy.planet(home).unwrap().stockpile.rations;
            prop_assert!(now <= last);
            last = now;
        }
    }

    /// A round kills at most one unit per side and never touches resources.
    #[test]
    fn prop_round_conserves_units_and_resources(
        attackers in prop::collection::vec(arb_unit_kind(), 1..5),
        defenders in prop::collection::vec(arb_unit_kind(), 1..5),
        rolls in arb_rolls(16, 400),
    ) {
        let catalog = catalog();
        let mut ids = IdAllocator::new();
        let mut a = garrisoned_planet(&mut ids, 1, &attackers, &catalog).unwrap();
        let mut d = garrisoned_planet(&mut ids, 2, &defenders, &catalog).unwrap();
        let mut attack = Attack::new(ids.next(), a.id, d.id);
        let options = RoundOptions {
            auto_select_attack: AutoSelect::Strongest,
            ..RoundOptions::default()
        };
        let mut dice = SequenceDice::new(rolls);

        let mut living = (a.living_units(), d.living_units());
        while living.0 > 0 && living.1 > 0 {
            let stock = (a.stockpile, d.stockpile);
            let report = combat::resolve_round(&mut attack, &mut a, &mut d, options, &catalog, &mut dice).unwrap();
            let now = (a.living_units(), d.living_units());

            prop_assert!(now.0 <= living.0 && living.0 - now.0 <= 1);
            prop_assert!(now.1 <= living.1 && living.1 - now.1 <= 1);
            prop_assert_eq!(now.0 < living.0, !report.attack_survives);
            prop_assert_eq!(now.1 < living.1, !report.defence_survives);
            prop_assert_eq!((a.stockpile, d.stockpile), stock);
            prop_assert_eq!(report.outcome.is_some(), now.0 == 0 || now.1 == 0);
            living = now;
        }
    }
}
