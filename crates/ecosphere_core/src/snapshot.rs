//! Read-only world snapshots and schema-versioned JSON persistence.
//!
//! A snapshot is a pure read: producing one never mutates the world, and
//! every serialized container is ordered, so save -> load -> save yields
//! bit-identical files.

use crate::clock::{Season, SimClock};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::monitor::EcosystemMonitor;
use crate::mycorrhiza::PlantNetwork;
use crate::pressure::PressureSystem;
use crate::rng::RngHub;
use crate::signals::SignalBoard;
use crate::society::warfare::DiplomacyTable;
use crate::species::SpeciesRegistry;
use crate::wind::WindField;
use crate::world::World;
use ecosphere_data::{
    Colony, Conflict, DecayItem, Egg, Entity, EntityId, Event, Grain, LinkState, Plant, PlantId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Current snapshot schema version. Loads of older versions run the
/// documented migrations; newer versions are rejected.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMeta {
    pub tick: u64,
    pub seed: u64,
    pub season: Season,
    pub year: u64,
}

/// Per-entity neural summary for external consumers; full weights live on
/// the entity records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralSummary {
    pub entity_id: EntityId,
    pub layer_sizes: Vec<usize>,
    pub success_rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub schema_version: u32,
    pub world: WorldMeta,
    pub config: SimConfig,
    pub grid: crate::grid::WorldGrid,
    pub wind: WindField,
    pub entities: Vec<Entity>,
    pub plants: Vec<Plant>,
    pub grains: Vec<Grain>,
    pub eggs: Vec<Egg>,
    pub decay_items: Vec<DecayItem>,
    pub colonies: Vec<Colony>,
    pub conflicts: Vec<Conflict>,
    pub diplomacy: DiplomacyTable,
    pub plant_links: Vec<(PlantId, PlantId, LinkState)>,
    /// Chemical signals still hopping through the plant network.
    pub plant_signals: Vec<(PlantId, Vec<ecosphere_data::ChemicalSignal>)>,
    pub species: SpeciesRegistry,
    pub pressures: PressureSystem,
    pub signals: SignalBoard,
    pub events: Vec<Event>,
    pub monitor: EcosystemMonitor,
    /// Trend classification over the monitor's current window.
    pub trends: crate::monitor::Trends,
    pub neural: Vec<NeuralSummary>,
    pub allocators: Allocators,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocators {
    pub next_entity_id: u64,
    pub next_plant_id: u64,
    pub next_grain_id: u64,
    pub next_egg_id: u64,
    pub next_colony_id: u32,
    pub removed_entities: u64,
}

impl World {
    /// Produce a complete read-only snapshot of the current tick.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        let neural = self
            .entities
            .iter()
            .filter_map(|e| {
                e.brain.as_ref().map(|b| NeuralSummary {
                    entity_id: e.identity.id,
                    layer_sizes: b.layer_sizes(),
                    success_rate: b.success_rate,
                })
            })
            .collect();

        WorldSnapshot {
            schema_version: SCHEMA_VERSION,
            world: WorldMeta {
                tick: self.clock.tick,
                seed: self.rng.master_seed(),
                season: self.clock.season(),
                year: self.clock.year(),
            },
            config: self.config.clone(),
            grid: self.grid.clone(),
            wind: self.wind.clone(),
            entities: self.entities.clone(),
            plants: self.plants.clone(),
            grains: self.grains.clone(),
            eggs: self.eggs.clone(),
            decay_items: self.decay_items.clone(),
            colonies: self.colonies.clone(),
            conflicts: self.conflicts.clone(),
            diplomacy: self.diplomacy.clone(),
            plant_links: self.network.links(),
            plant_signals: self.network.inbox_snapshot(),
            species: self.species.clone(),
            pressures: self.pressures.clone(),
            signals: self.signals.clone(),
            events: self.events.all(),
            monitor: self.monitor.clone(),
            trends: self.monitor.trends(&self.config.monitor),
            neural,
            allocators: Allocators {
                next_entity_id: self.next_entity_id,
                next_plant_id: self.next_plant_id,
                next_grain_id: self.next_grain_id,
                next_egg_id: self.next_egg_id,
                next_colony_id: self.next_colony_id,
                removed_entities: self.removed_entities,
            },
        }
    }

    /// Reconstruct a world from a snapshot, rebuilding the derived state
    /// (id indexes, plant network) that is not stored explicitly.
    pub fn from_snapshot(snapshot: WorldSnapshot) -> Result<Self, SimError> {
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(SimError::Config(format!(
                "snapshot schema version {} does not match engine version {}",
                snapshot.schema_version, SCHEMA_VERSION
            )));
        }
        snapshot
            .config
            .validate()
            .map_err(|e| SimError::Config(e.to_string()))?;

        let plant_ids: Vec<PlantId> = snapshot.plants.iter().map(|p| p.id).collect();
        let network =
            PlantNetwork::restore(snapshot.plant_links, &plant_ids, snapshot.plant_signals);

        let mut world = World {
            clock: SimClock {
                tick: snapshot.world.tick,
            },
            rng: RngHub::new(snapshot.world.seed),
            grid: snapshot.grid,
            wind: snapshot.wind,
            entities: snapshot.entities,
            plants: snapshot.plants,
            grains: snapshot.grains,
            eggs: snapshot.eggs,
            decay_items: snapshot.decay_items,
            colonies: snapshot.colonies,
            conflicts: snapshot.conflicts,
            network,
            species: snapshot.species,
            pressures: snapshot.pressures,
            signals: snapshot.signals,
            diplomacy: snapshot.diplomacy,
            events: crate::events::EventBus::from(snapshot.events),
            monitor: snapshot.monitor,
            next_entity_id: snapshot.allocators.next_entity_id,
            next_plant_id: snapshot.allocators.next_plant_id,
            next_grain_id: snapshot.allocators.next_grain_id,
            next_egg_id: snapshot.allocators.next_egg_id,
            next_colony_id: snapshot.allocators.next_colony_id,
            entity_index: HashMap::new(),
            plant_index: HashMap::new(),
            removed_entities: snapshot.allocators.removed_entities,
            config: snapshot.config,
        };
        world.rebuild_entity_index();
        world.rebuild_plant_index();
        Ok(world)
    }
}

impl WorldSnapshot {
    /// Canonical JSON encoding.
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SimError> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Parse a snapshot, applying migrations for older schema versions.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let mut value: serde_json::Value = serde_json::from_str(json)?;
        let version = value
            .get("schema_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| SimError::Config("snapshot missing schema_version".to_string()))?
            as u32;

        if version > SCHEMA_VERSION {
            return Err(SimError::Config(format!(
                "snapshot schema version {} is newer than this engine ({})",
                version, SCHEMA_VERSION
            )));
        }
        for from in version..SCHEMA_VERSION {
            migrate(&mut value, from)?;
        }

        Ok(serde_json::from_value(value)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Migrate a snapshot value from `from` to `from + 1`.
///
/// Version history:
/// - 0 -> 1: `conflicts`, `decay_items`, and `plant_signals` collections
///   introduced; absent lists default to empty.
fn migrate(value: &mut serde_json::Value, from: u32) -> Result<(), SimError> {
    match from {
        0 => {
            let obj = value
                .as_object_mut()
                .ok_or_else(|| SimError::Config("snapshot root is not an object".to_string()))?;
            obj.entry("conflicts")
                .or_insert_with(|| serde_json::Value::Array(Vec::new()));
            obj.entry("decay_items")
                .or_insert_with(|| serde_json::Value::Array(Vec::new()));
            obj.entry("plant_signals")
                .or_insert_with(|| serde_json::Value::Array(Vec::new()));
            obj.insert(
                "schema_version".to_string(),
                serde_json::Value::from(1u32),
            );
            Ok(())
        }
        _ => Err(SimError::Config(format!(
            "no migration from snapshot schema version {}",
            from
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_world() -> World {
        let mut config = SimConfig::default();
        config.world.width = 40;
        config.world.height = 40;
        config.world.seed = 9;
        config.world.initial_entities = 10;
        config.world.initial_plants = 15;
        World::new_seeded(config).unwrap()
    }

    #[test]
    fn snapshot_is_a_pure_read() {
        let mut world = seeded_world();
        for _ in 0..20 {
            world.step().unwrap();
        }
        let before = world.state_digest();
        let _snapshot = world.snapshot();
        assert_eq!(world.state_digest(), before);
    }

    #[test]
    fn save_load_save_is_bit_identical() {
        let mut world = seeded_world();
        for _ in 0..20 {
            world.step().unwrap();
        }
        let json_a = world.snapshot().to_json().unwrap();
        let restored = World::from_snapshot(WorldSnapshot::from_json(&json_a).unwrap()).unwrap();
        let json_b = restored.snapshot().to_json().unwrap();
        assert_eq!(json_a, json_b);
    }

    #[test]
    fn restored_world_resumes_identically() {
        let mut world = seeded_world();
        for _ in 0..10 {
            world.step().unwrap();
        }
        let snapshot = world.snapshot();
        let mut restored = World::from_snapshot(snapshot).unwrap();

        for _ in 0..10 {
            world.step().unwrap();
            restored.step().unwrap();
        }
        assert_eq!(world.state_digest(), restored.state_digest());
    }

    #[test]
    fn newer_schema_is_rejected() {
        let world = seeded_world();
        let mut value: serde_json::Value =
            serde_json::from_str(&world.snapshot().to_json().unwrap()).unwrap();
        value["schema_version"] = serde_json::Value::from(99u32);
        let json = value.to_string();
        assert!(WorldSnapshot::from_json(&json).is_err());
    }

    #[test]
    fn version_zero_snapshot_migrates() {
        let world = seeded_world();
        let mut value: serde_json::Value =
            serde_json::from_str(&world.snapshot().to_json().unwrap()).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("conflicts");
        obj.remove("decay_items");
        obj.remove("plant_signals");
        obj.insert("schema_version".to_string(), serde_json::Value::from(0u32));
        let migrated = WorldSnapshot::from_json(&value.to_string()).unwrap();
        assert_eq!(migrated.schema_version, SCHEMA_VERSION);
        assert!(migrated.conflicts.is_empty());
    }
}
