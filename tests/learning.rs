//! Neural decision lifecycle: networks appear only above the intelligence
//! threshold, keep deciding every tick, and track outcomes in the success
//! ring.

mod common;

use ecosphere_lib::data::{Classification, TraitId};
use ecosphere_lib::world::World;
use ecosphere_core::species::Realm;

#[test]
fn intelligent_cohort_builds_brains_and_learns() {
    let mut config = common::base_config(5);
    config.world.initial_plants = 120;
    config.world.width = 60;
    config.world.height = 60;
    // Keep the arena free of confounding stressors.
    config.pressure.activation_chance = 0.0;
    let mut world = World::new_seeded(config).unwrap();

    let species = world
        .species
        .found(Realm::Fauna, "fauna-0", Default::default(), None, 0);

    // Identical genetics except intelligence.
    let bright_dna = common::dna_with(0.0, &[(TraitId::Intelligence, 0.8)]);
    let dull_dna = common::dna_with(0.0, &[(TraitId::Intelligence, 0.0)]);
    common::spawn_cluster(
        &mut world,
        &bright_dna,
        Classification::Herbivore,
        (20.0, 30.0),
        10,
        species,
    );
    common::spawn_cluster(
        &mut world,
        &dull_dna,
        Classification::Herbivore,
        (40.0, 30.0),
        10,
        species,
    );
    // Full reserves so the whole founding cohort outlives the run.
    for e in world.entities.iter_mut() {
        e.metabolism.energy = e.metabolism.energy_cap;
    }

    for _ in 0..150 {
        world.step().unwrap();
    }

    let founders_bright: Vec<_> = world
        .entities
        .iter()
        .filter(|e| {
            e.identity.generation == 0
                && e.metabolism.alive
                && e.traits.get(TraitId::Intelligence) > 0.5
        })
        .collect();
    let founders_dull: Vec<_> = world
        .entities
        .iter()
        .filter(|e| {
            e.identity.generation == 0
                && e.metabolism.alive
                && e.traits.get(TraitId::Intelligence) < 0.1
        })
        .collect();

    assert!(
        !founders_bright.is_empty(),
        "bright cohort should have survivors"
    );
    for e in &founders_bright {
        let brain = e.brain.as_ref().expect("intelligent entity without brain");
        assert!(
            brain.decisions > 100,
            "brain should decide every tick, saw {}",
            brain.decisions
        );
        assert!((0.0..=1.0).contains(&brain.success_rate));
        // Hidden width scales with intelligence: wider than the base.
        assert!(brain.layer_sizes()[1] > world.config.neural.hidden_base);
    }
    for e in &founders_dull {
        assert!(e.brain.is_none(), "dull entity must not own a network");
    }

    // The reward ring is being exercised: bright survivors register
    // positive outcomes in a plant-rich world.
    let any_success = founders_bright
        .iter()
        .filter_map(|e| e.brain.as_ref())
        .any(|b| b.success_rate > 0.0);
    assert!(any_success, "no brain ever recorded a positive outcome");
}
