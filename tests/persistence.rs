//! Snapshot persistence: save -> load -> save is bit-identical, and a
//! restored world resumes in lockstep with the original.

mod common;

use ecosphere_lib::{World, WorldSnapshot};

#[test]
fn save_load_save_files_are_bit_identical() {
    let mut config = common::base_config(8);
    config.world.initial_entities = 20;
    config.world.initial_plants = 30;
    let mut world = World::new_seeded(config).unwrap();
    for _ in 0..100 {
        world.step().unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let path_a = dir.path().join("world_a.json");
    let path_b = dir.path().join("world_b.json");

    world.snapshot().save(&path_a).unwrap();
    let restored = World::from_snapshot(WorldSnapshot::load(&path_a).unwrap()).unwrap();
    restored.snapshot().save(&path_b).unwrap();

    let bytes_a = std::fs::read(&path_a).unwrap();
    let bytes_b = std::fs::read(&path_b).unwrap();
    assert_eq!(bytes_a, bytes_b);
}

#[test]
fn restored_world_resumes_in_lockstep() {
    let mut config = common::base_config(9);
    config.world.initial_entities = 20;
    config.world.initial_plants = 30;
    let mut world = World::new_seeded(config).unwrap();
    for _ in 0..60 {
        world.step().unwrap();
    }

    let mut restored = World::from_snapshot(world.snapshot()).unwrap();
    assert_eq!(world.state_digest(), restored.state_digest());

    for _ in 0..60 {
        world.step().unwrap();
        restored.step().unwrap();
    }
    assert_eq!(world.state_digest(), restored.state_digest());
    assert_eq!(
        world.snapshot().to_json().unwrap(),
        restored.snapshot().to_json().unwrap()
    );
}
