//! Colony formation and warfare: two cooperative-intelligent clusters
//! organize into colonies, detect a shared border, and eventually clash.

mod common;

use ecosphere_lib::data::{CasteRole, Classification, EventPayload, Relation, TraitId};
use ecosphere_lib::world::World;
use ecosphere_core::species::Realm;

#[test]
fn two_clusters_form_colonies_and_clash() {
    let mut config = common::base_config(6);
    config.world.width = 100;
    config.world.height = 40;
    config.world.initial_plants = 150;
    config.colony.border_overlap_threshold = 1;
    config.pressure.activation_chance = 0.0;
    let mut world = World::new_seeded(config).unwrap();

    let species = world
        .species
        .found(Realm::Fauna, "fauna-0", Default::default(), None, 0);

    let social_dna = common::dna_with(
        0.0,
        &[
            (TraitId::Cooperation, 0.8),
            (TraitId::Intelligence, 0.8),
            (TraitId::Aggression, 0.5),
        ],
    );
    common::spawn_cluster(
        &mut world,
        &social_dna,
        Classification::Omnivore,
        (30.0, 20.0),
        20,
        species,
    );
    common::spawn_cluster(
        &mut world,
        &social_dna,
        Classification::Omnivore,
        (70.0, 20.0),
        20,
        species,
    );
    for e in world.entities.iter_mut() {
        e.metabolism.energy = e.metabolism.energy_cap;
    }

    let mut colonies_by_500 = 0;
    let mut border_by_1000 = false;
    let mut conflict_seen = false;

    for _ in 0..1500u64 {
        world.step().unwrap();
        let tick = world.clock.tick;

        // Keep the cohort provisioned so social dynamics, not starvation,
        // drive the scenario.
        if tick % 100 == 0 {
            for e in world.entities.iter_mut() {
                if e.metabolism.alive {
                    e.metabolism.energy = e.metabolism.energy_cap;
                }
            }
        }

        if tick == 500 {
            colonies_by_500 = world.colonies.len();
        }
        if tick == 1000 && world.colonies.len() >= 2 {
            let a = world.colonies[0].id;
            let b = world.colonies[1].id;
            border_by_1000 = world.diplomacy.get(a, b).relation != Relation::Neutral;
        }
        if world
            .events
            .count_matching(|e| matches!(e.payload, EventPayload::ConflictDeclared { .. }))
            >= 1
        {
            conflict_seen = true;
        }
    }

    assert!(
        colonies_by_500 >= 2,
        "expected two colonies by tick 500, saw {colonies_by_500}"
    );
    assert!(
        border_by_1000,
        "border pressure should have moved the pair off Neutral by tick 1000"
    );
    assert!(conflict_seen, "expected at least one declared conflict");

    // Caste structure: each colony elected one queen and respected the
    // soldier quota.
    for colony in &world.colonies {
        assert_eq!(colony.caste_counts[CasteRole::Queen.index()], 1);
        let soldiers = colony.caste_counts[CasteRole::Soldier.index()] as usize;
        assert!(soldiers <= colony.members.len() / 4 + 1);
    }

    // Battles leave a record once declared.
    if conflict_seen {
        assert!(
            world
                .events
                .count_matching(|e| matches!(e.payload, EventPayload::BattleResolved { .. }))
                >= 1
        );
    }
}
