//! Two runs with the same seed and configuration must be byte-identical at
//! every observation point; different seeds must diverge.

mod common;

use ecosphere_lib::World;

#[test]
fn same_seed_runs_are_identical() {
    let config = {
        let mut c = common::base_config(12345);
        c.world.initial_entities = 25;
        c.world.initial_plants = 40;
        c
    };

    let mut a = World::new_seeded(config.clone()).unwrap();
    let mut b = World::new_seeded(config).unwrap();

    for tick in 1..=200u64 {
        a.step().unwrap();
        b.step().unwrap();
        if tick % 25 == 0 {
            assert_eq!(
                a.state_digest(),
                b.state_digest(),
                "state diverged at tick {tick}"
            );
        }
    }

    // Snapshots match byte for byte, not just by digest.
    let json_a = a.snapshot().to_json().unwrap();
    let json_b = b.snapshot().to_json().unwrap();
    assert_eq!(json_a, json_b);
}

#[test]
fn different_seeds_diverge() {
    let mut config_a = common::base_config(1);
    config_a.world.initial_entities = 25;
    config_a.world.initial_plants = 40;
    let mut config_b = config_a.clone();
    config_b.world.seed = 2;

    let mut a = World::new_seeded(config_a).unwrap();
    let mut b = World::new_seeded(config_b).unwrap();
    for _ in 0..50 {
        a.step().unwrap();
        b.step().unwrap();
    }
    assert_ne!(a.state_digest(), b.state_digest());
}

#[test]
fn event_log_ticks_are_non_decreasing() {
    let mut config = common::base_config(7);
    config.world.initial_entities = 25;
    config.world.initial_plants = 40;
    let mut world = World::new_seeded(config).unwrap();
    for _ in 0..150 {
        world.step().unwrap();
    }
    let events = world.events.all();
    assert!(!events.is_empty());
    assert!(events.windows(2).all(|w| w[0].tick <= w[1].tick));
}
