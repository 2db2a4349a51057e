//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! A galaxy is only ever caught up on demand, so two servers (or a server
//! and a replay of its command log) must agree on every catch-up. Sources
//! of non-determinism include:
//!
//! - **Floating-point math**: we use fixed-point arithmetic via
//!   [`galaxy_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: the core only uses ordered maps keyed by
//!   entity id.
//!
//! - **System randomness and wall time**: dice and clocks are injected.
//!   Scripts here run on seeded [`RngDice`] and a fixed timeline.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual rules (training, upkeep, combat, movement)
//! 2. **Property tests**: random command scripts must replay exactly
//! 3. **Integration tests**: snapshots restore to an identical state
//! 4. **Parallel tests**: running N scripts on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use galaxy_core::buildings::BuildingKind;
use galaxy_core::combat::{AutoSelect, RoundOptions};
use galaxy_core::components::{BuildingId, GridPos};
use galaxy_core::dice::RngDice;
use galaxy_core::error::Result;
use galaxy_core::galaxy::Galaxy;
use galaxy_core::units::UnitKind;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::fixtures::World;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps applied per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `steps` - Number of steps to apply per run
/// * `setup` - Function to create initial state
/// * `step` - Function to apply step `n`
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use galaxy_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 steps each
///     World::new,
///     |world, _| { world.wait(60); },
///     |world| world.galaxy.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for n in 0..steps {
            step(&mut state, n);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Run N simulations on scoped threads and verify they all agree.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel<S, Setup, Step, HashFn>(
    num_sims: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S + Sync,
    Step: Fn(&mut S, u64) + Sync,
    HashFn: Fn(&S) -> u64 + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut state = setup();
                    for n in 0..steps {
                        step(&mut state, n);
                    }
                    hash(&state)
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps,
    }
}

/// Compare two runs step by step, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(n)` if they differ after
/// `n` steps.
pub fn find_first_divergence<S, Setup, Step, HashFn>(
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> Option<u64>
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut first = setup();
    let mut second = setup();

    if hash(&first) != hash(&second) {
        return Some(0);
    }

    for n in 0..steps {
        step(&mut first, n);
        step(&mut second, n);

        if hash(&first) != hash(&second) {
            return Some(n + 1);
        }
    }

    None
}

/// Verify that a snapshot round-trip preserves the galaxy exactly.
#[must_use]
pub fn verify_snapshot_determinism(galaxy: &Galaxy) -> bool {
    let Ok(bytes) = galaxy.to_snapshot() else {
        return false;
    };
    let Ok(restored) = Galaxy::from_snapshot(&bytes) else {
        return false;
    };
    restored == *galaxy && restored.state_hash() == galaxy.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

// ============================================================================
// Scripted sessions
// ============================================================================

/// One player action in a scripted session.
///
/// Every action is issued by the home planet's owner against the rival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Let seconds pass and catch every planet up.
    Wait(u64),
    /// Queue a level-1 unit at the home barrack.
    Train(UnitKind),
    /// Load rations onto the home ship.
    BoardRations(u64),
    /// Load the strongest trained home unit onto the ship.
    BoardUnit,
    /// Send the home ship to the rival.
    Launch,
    /// Play a round against the rival, opening an attack if needed.
    Round,
}

/// A [`World`] with a home barrack and spaceport, and a rival barrack.
#[derive(Debug)]
pub struct Scenario {
    /// The world.
    pub world: World,
    /// Home barrack.
    pub barrack: BuildingId,
    /// Home spaceport.
    pub spaceport: BuildingId,
    /// Rival barrack.
    pub rival_barrack: BuildingId,
}

impl Scenario {
    /// Build the barracks and spaceport and give the rival two marines.
    ///
    /// # Panics
    ///
    /// Panics if setup fails.
    #[must_use]
    pub fn new() -> Self {
        let mut world = World::new();
        let (home, rival) = (world.home, world.rival);
        let barrack = world.build_finished(home, BuildingKind::Barrack, GridPos::new(0, 0));
        let spaceport = world.build_finished(home, BuildingKind::Spaceport, GridPos::new(1, 0));
        let rival_barrack = world.build_finished(rival, BuildingKind::Barrack, GridPos::new(0, 0));
        world.train(rival, rival_barrack, UnitKind::SpaceMarine, 2);
        Self {
            world,
            barrack,
            spaceport,
            rival_barrack,
        }
    }

    /// Apply one action. Rejected commands are part of normal play.
    ///
    /// # Errors
    ///
    /// Whatever the galaxy rejects the command with.
    pub fn apply(&mut self, action: Action, dice: &mut RngDice<StdRng>) -> Result<()> {
        let world = &mut self.world;
        let (home, rival) = (world.home, world.rival);
        match action {
            Action::Wait(secs) => {
                world.wait(secs);
            }
            Action::Train(kind) => {
                world.galaxy.train_unit(home, self.barrack, kind, 1, &world.catalog)?;
            }
            Action::BoardRations(amount) => {
                world.galaxy.board_rations(home, self.spaceport, amount, &world.catalog)?;
            }
            Action::BoardUnit => {
                let strongest = world.galaxy.planet(home)?.strongest_unit(None, &world.catalog)?;
                if let Some(unit) = strongest {
                    world
                        .galaxy
                        .board_attack_unit(home, self.spaceport, unit, &world.catalog)?;
                }
            }
            Action::Launch => {
                world
                    .galaxy
                    .move_from_to_planet(home, self.spaceport, rival, &world.catalog)?;
            }
            Action::Round => {
                let attack = match world.galaxy.attack_by(home) {
                    Some(attack) => attack,
                    None => world.galaxy.attack(home, rival)?,
                };
                let options = RoundOptions {
                    auto_select_attack: AutoSelect::Strongest,
                    ..RoundOptions::default()
                };
                world.galaxy.play_round(attack, options, &world.catalog, dice)?;
            }
        }
        Ok(())
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

/// Play `script` on a fresh [`Scenario`] with dice seeded by `seed`.
#[must_use]
pub fn play_script(script: &[Action], seed: u64) -> Scenario {
    let mut scenario = Scenario::new();
    let mut dice = RngDice(StdRng::seed_from_u64(seed));
    for action in script {
        if let Err(e) = scenario.apply(*action, &mut dice) {
            tracing::trace!(?action, error = %e, "Scripted action rejected");
        }
    }
    scenario
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use galaxy_core::units::UnitKind;
    use proptest::prelude::*;

    use super::Action;

    /// Any unit type.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        prop_oneof![
            Just(UnitKind::SpaceMarine),
            Just(UnitKind::SpaceCommando),
            Just(UnitKind::SpaceDrone),
        ]
    }

    /// A wait between commands.
    ///
    /// Range: 0 to 2 hours, so ships and training queues cross leg
    /// boundaries.
    pub fn arb_wait_secs() -> impl Strategy<Value = u64> {
        0u64..7200
    }

    /// Any scripted action.
    pub fn arb_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            3 => arb_wait_secs().prop_map(Action::Wait),
            2 => arb_unit_kind().prop_map(Action::Train),
            1 => (0u64..500).prop_map(Action::BoardRations),
            1 => Just(Action::BoardUnit),
            1 => Just(Action::Launch),
            2 => Just(Action::Round),
        ]
    }

    /// A script of up to `max_len` actions.
    pub fn arb_script(max_len: usize) -> impl Strategy<Value = Vec<Action>> {
        prop::collection::vec(arb_action(), 0..max_len)
    }

    /// Scripted dice rolls, each in `0..=max`.
    pub fn arb_rolls(len: usize, max: u32) -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(0..=max, len)
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use proptest::prelude::*;

    // =========================================================================
    // Harness
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n, _| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_divergence_is_found() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let counter = AtomicU64::new(0);
        // Each setup starts one higher than the last
        let divergence = find_first_divergence(
            5,
            || counter.fetch_add(1, Ordering::SeqCst),
            |n, _| *n += 1,
            |n| *n,
        );
        assert_eq!(divergence, Some(0));
    }

    // =========================================================================
    // Galaxy sessions
    // =========================================================================

    #[test]
    fn test_waiting_is_deterministic() {
        let result = verify_determinism(
            3,
            20,
            Scenario::new,
            |s, n| {
                s.world.wait(30 + n * 7);
            },
            |s| s.world.galaxy.state_hash(),
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_no_divergence_in_combat_session() {
        let script = [
            Action::Train(UnitKind::SpaceMarine),
            Action::Train(UnitKind::SpaceMarine),
            Action::Wait(120),
            Action::Round,
            Action::Round,
            Action::Round,
        ];
        let divergence = find_first_divergence(
            script.len() as u64,
            || (Scenario::new(), RngDice(StdRng::seed_from_u64(7))),
            |(scenario, dice), n| {
                let _ = scenario.apply(script[usize::try_from(n).unwrap()], dice);
            },
            |(scenario, _)| scenario.world.galaxy.state_hash(),
        );
        assert!(divergence.is_none(), "Expected no divergence");
    }

    #[test]
    fn test_parallel_scripts_agree() {
        let script = [
            Action::Train(UnitKind::SpaceMarine),
            Action::BoardRations(100),
            Action::Launch,
            Action::Wait(600),
            Action::BoardUnit,
            Action::Wait(1500),
            Action::Round,
        ];
        let result = run_parallel(
            4,
            1,
            || None::<Scenario>,
            |state, _| *state = Some(play_script(&script, 42)),
            |state| state.as_ref().map_or(0, |s| s.world.galaxy.state_hash()),
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_snapshot_preserves_session() {
        let script = [
            Action::Train(UnitKind::SpaceMarine),
            Action::BoardRations(250),
            Action::Launch,
            Action::Wait(400),
        ];
        let scenario = play_script(&script, 1);
        assert!(verify_snapshot_determinism(&scenario.world.galaxy));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_scripts_replay_exactly(script in arb_script(24), seed in any::<u64>()) {
            let first = play_script(&script, seed);
            let second = play_script(&script, seed);
            prop_assert_eq!(first.world.galaxy.state_hash(), second.world.galaxy.state_hash());
        }

        #[test]
        fn prop_snapshot_roundtrip_is_exact(script in arb_script(16), seed in any::<u64>()) {
            let scenario = play_script(&script, seed);
            prop_assert!(verify_snapshot_determinism(&scenario.world.galaxy));
        }
    }
}
