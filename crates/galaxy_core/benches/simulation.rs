//! Simulation benchmarks for galaxy_core.
//!
//! Run with: `cargo bench -p galaxy_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use galaxy_core::buildings::BuildingKind;
use galaxy_core::components::GridPos;
use galaxy_core::dice::RngDice;
use galaxy_core::galaxy::Galaxy;
use galaxy_core::units::UnitKind;
use galaxy_test_utils::balance::simulate_battle;
use galaxy_test_utils::determinism::{Action, Scenario};
use galaxy_test_utils::fixtures::{catalog, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Catching up a busy planet after a day away.
pub fn catch_up_benchmark(c: &mut Criterion) {
    c.bench_function("catch_up_one_day", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                let home = world.home;
                let barrack = world.build_finished(home, BuildingKind::Barrack, GridPos::new(0, 0));
                let farm = world.build_finished(home, BuildingKind::Farm, GridPos::new(1, 0));
                world.train(home, barrack, UnitKind::SpaceMarine, 3);
                world
                    .galaxy
                    .start_gathering(home, farm, &world.catalog)
                    .expect("farm starts");
                world
            },
            |mut world| black_box(world.wait(24 * 3600)),
            BatchSize::SmallInput,
        );
    });
}

/// A full battle between two mixed armies.
pub fn battle_benchmark(c: &mut Criterion) {
    let catalog = catalog();
    let army = [
        UnitKind::SpaceMarine,
        UnitKind::SpaceMarine,
        UnitKind::SpaceCommando,
        UnitKind::SpaceDrone,
    ];
    let mut dice = RngDice(StdRng::seed_from_u64(1));
    c.bench_function("battle_4v4", |b| {
        b.iter(|| black_box(simulate_battle(&army, &army, &catalog, &mut dice)));
    });
}

/// Snapshot encode and decode of a scripted session.
pub fn snapshot_benchmark(c: &mut Criterion) {
    let mut scenario = Scenario::new();
    let mut dice = RngDice(StdRng::seed_from_u64(2));
    for action in [
        Action::Train(UnitKind::SpaceMarine),
        Action::BoardRations(200),
        Action::Launch,
        Action::Wait(300),
    ] {
        let _ = scenario.apply(action, &mut dice);
    }
    let galaxy = &scenario.world.galaxy;
    c.bench_function("snapshot_roundtrip", |b| {
        b.iter(|| {
            let bytes = galaxy.to_snapshot().expect("encodes");
            black_box(Galaxy::from_snapshot(&bytes))
        });
    });
}

criterion_group!(benches, catch_up_benchmark, battle_benchmark, snapshot_benchmark);
criterion_main!(benches);
