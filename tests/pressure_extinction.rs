//! A harsh climate pressure over a food-poor region drives a lineage to
//! extinction, and the registry reports it.

mod common;

use ecosphere_lib::data::{Classification, EventPayload, Position, TraitVector};
use ecosphere_lib::world::World;
use ecosphere_core::pressure::{Pressure, PressureKind};
use ecosphere_core::species::Realm;

#[test]
fn climate_pressure_extinguishes_an_isolated_lineage() {
    let mut config = common::base_config(2);
    config.world.initial_plants = 0; // food-poor world
    let mut world = World::new_seeded(config).unwrap();

    let lineage = world
        .species
        .found(Realm::Fauna, "fauna-polar", TraitVector::default(), None, 0);
    let dna = common::uniform_dna(0.0);
    common::spawn_cluster(
        &mut world,
        &dna,
        Classification::Herbivore,
        (25.0, 45.0), // high latitude
        30,
        lineage,
    );

    let mut pressure_applied = false;
    let mut extinct_at = None;
    for _ in 0..2500u64 {
        world.step().unwrap();

        if world.clock.tick == 100 {
            world.pressures.active.push(Pressure {
                kind: PressureKind::ClimateChange,
                center: Position::new(25.0, 45.0),
                radius: 60.0,
                severity: 0.8,
                started_tick: 100,
                duration: None,
            });
            pressure_applied = true;
        }

        let survivors = world
            .entities
            .iter()
            .filter(|e| e.metabolism.alive && e.identity.species == lineage)
            .count();
        if extinct_at.is_none() && survivors == 0 && world.clock.tick > 100 {
            extinct_at = Some(world.clock.tick);
        }
        if world
            .species
            .get(lineage)
            .is_some_and(|r| r.extinct_tick.is_some())
        {
            break;
        }
    }

    assert!(pressure_applied);
    let extinct_at = extinct_at.expect("lineage should die out under pressure");
    assert!(
        extinct_at <= 1500,
        "population should collapse well before tick 1500, died at {extinct_at}"
    );
    assert!(world
        .species
        .get(lineage)
        .is_some_and(|r| r.extinct_tick.is_some()));
    assert!(
        world
            .events
            .count_matching(|e| matches!(e.payload, EventPayload::Extinction { .. }))
            >= 1
    );
}
