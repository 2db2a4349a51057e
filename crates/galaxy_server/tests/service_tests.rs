//! Service tests: commands run through the store with a hand-driven clock.

use galaxy_core::buildings::BuildingKind;
use galaxy_core::clock::Timestamp;
use galaxy_core::combat::Spoils;
use galaxy_core::components::{BuildingId, GridPos, OwnerId, Stockpile};
use galaxy_core::error::GameError;
use galaxy_core::galaxy::Galaxy;
use galaxy_core::units::UnitKind;
use galaxy_server::config::ServerConfig;
use galaxy_server::service::GameService;
use galaxy_server::store::{GameStore, InMemoryStore};
use galaxy_test_utils::fixtures::{catalog, ManualClock};

fn service(clock: &ManualClock) -> GameService<InMemoryStore, &ManualClock> {
    GameService::new(InMemoryStore::default(), clock, catalog(), Some(42))
}

#[test]
fn test_commands_see_elapsed_time() {
    let clock = ManualClock::new(Timestamp::from_secs(1000));
    let svc = service(&clock);
    let home = svc.colonize(OwnerId::new(1), "Home").unwrap();
    let settlement = svc.planet(home).unwrap().settlements[0].id;

    let farm = svc
        .build(home, settlement, BuildingKind::Farm, GridPos::new(0, 0))
        .unwrap();
    assert_eq!(
        svc.start_gathering(home, farm).unwrap_err(),
        GameError::UnderConstruction(farm)
    );
    assert_eq!(svc.planet(home).unwrap().stockpile, Stockpile::new(800, 750));

    // Farm takes 10 seconds to build
    clock.advance_secs(10);
    svc.start_gathering(home, farm).unwrap();
}

#[test]
fn test_failed_command_leaves_state_untouched() {
    let clock = ManualClock::default();
    let svc = service(&clock);
    let home = svc.colonize(OwnerId::new(1), "Home").unwrap();
    let before = svc.store().read(Galaxy::state_hash);

    // The catch-up to the new time is rolled back with the failed command
    clock.advance_secs(3600);
    assert!(svc
        .train_unit(home, BuildingId::new(9999), UnitKind::SpaceMarine, 1)
        .is_err());
    assert_eq!(svc.store().read(Galaxy::state_hash), before);
}

#[test]
fn test_retreat_through_the_service() {
    let clock = ManualClock::default();
    let svc = service(&clock);
    let home = svc.colonize(OwnerId::new(1), "Home").unwrap();
    let rival = svc.colonize(OwnerId::new(2), "Rival").unwrap();

    let attack = svc.attack(home, rival).unwrap();
    assert_eq!(svc.attack(rival, home).unwrap_err(), GameError::AlreadyDefending(rival));

    let spoils = svc.lose(attack).unwrap();
    assert_eq!(
        spoils,
        Spoils {
            rations: 80,
            materials: 80
        }
    );
    assert_eq!(svc.planet(home).unwrap().stockpile, Stockpile::new(720, 720));
    assert!(svc.attack(rival, home).is_ok());
}

#[test]
fn test_snapshot_survives_restart() {
    let clock = ManualClock::default();
    let svc = service(&clock);
    svc.colonize(OwnerId::new(1), "Home").unwrap();
    svc.colonize(OwnerId::new(2), "Rival").unwrap();

    let path = std::env::temp_dir().join(format!("galaxy-service-{}.bin", std::process::id()));
    svc.store().save(&path).unwrap();

    let config = ServerConfig {
        snapshot_path: Some(path.clone()),
        ..ServerConfig::default()
    };
    let restarted = galaxy_server::start(&config, &clock).unwrap();
    assert_eq!(restarted.store().snapshot(), svc.store().snapshot());
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_start_without_snapshot_is_empty() {
    let clock = ManualClock::default();
    let config = ServerConfig {
        snapshot_path: Some(std::env::temp_dir().join("galaxy-service-missing.bin")),
        rng_seed: Some(1),
        ..ServerConfig::default()
    };
    let svc = galaxy_server::start(&config, &clock).unwrap();
    assert_eq!(svc.store().read(|g| g.planets().count()), 0);
}
