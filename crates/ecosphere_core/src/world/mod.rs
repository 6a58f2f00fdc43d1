//! The world: sole owner of every simulation collection, driven by the
//! fixed-order tick in [`update`].
//!
//! All cross-component references are ids resolved through the world's
//! id-to-index maps inside a phase; nothing holds a pointer to an entity
//! across phase boundaries.

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::events::EventBus;
use crate::grid::WorldGrid;
use crate::monitor::EcosystemMonitor;
use crate::mycorrhiza::PlantNetwork;
use crate::pressure::PressureSystem;
use crate::rng::RngHub;
use crate::signals::SignalBoard;
use crate::society::warfare::DiplomacyTable;
use crate::species::SpeciesRegistry;
use crate::wind::WindField;
use ecosphere_data::{
    Colony, ColonyId, Conflict, DecayItem, Egg, Entity, EntityId, Grain, GrainId, Plant, PlantId,
};
use std::collections::HashMap;

pub mod init;
pub mod invariants;
pub mod update;

pub struct World {
    pub config: SimConfig,
    pub clock: SimClock,
    pub rng: RngHub,
    pub grid: WorldGrid,
    pub wind: WindField,

    /// Live and corpse entities, always sorted by id.
    pub entities: Vec<Entity>,
    /// Live and dying plants, always sorted by id.
    pub plants: Vec<Plant>,
    pub grains: Vec<Grain>,
    pub eggs: Vec<Egg>,
    pub decay_items: Vec<DecayItem>,
    pub colonies: Vec<Colony>,
    pub conflicts: Vec<Conflict>,

    pub network: PlantNetwork,
    pub species: SpeciesRegistry,
    pub pressures: PressureSystem,
    pub signals: SignalBoard,
    pub diplomacy: DiplomacyTable,
    pub events: EventBus,
    pub monitor: EcosystemMonitor,

    pub(crate) next_entity_id: u64,
    pub(crate) next_plant_id: u64,
    pub(crate) next_grain_id: u64,
    pub(crate) next_egg_id: u64,
    pub(crate) next_colony_id: u32,

    pub(crate) entity_index: HashMap<EntityId, usize>,
    pub(crate) plant_index: HashMap<PlantId, usize>,

    /// Ids retired forever; used by the uniqueness invariant.
    pub(crate) removed_entities: u64,
}

impl World {
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entity_index.get(&id).map(|&i| &self.entities[i])
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entity_index
            .get(&id)
            .copied()
            .map(move |i| &mut self.entities[i])
    }

    #[must_use]
    pub fn plant(&self, id: PlantId) -> Option<&Plant> {
        self.plant_index.get(&id).map(|&i| &self.plants[i])
    }

    pub fn plant_mut(&mut self, id: PlantId) -> Option<&mut Plant> {
        self.plant_index
            .get(&id)
            .copied()
            .map(move |i| &mut self.plants[i])
    }

    #[must_use]
    pub fn live_entity_count(&self) -> usize {
        self.entities.iter().filter(|e| e.metabolism.alive).count()
    }

    #[must_use]
    pub fn live_plant_count(&self) -> usize {
        self.plants.iter().filter(|p| p.alive).count()
    }

    pub(crate) fn rebuild_entity_index(&mut self) {
        self.entity_index = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.identity.id, i))
            .collect();
    }

    pub(crate) fn rebuild_plant_index(&mut self) {
        self.plant_index = self
            .plants
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
    }

    pub(crate) fn alloc_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    pub(crate) fn alloc_plant_id(&mut self) -> PlantId {
        let id = PlantId(self.next_plant_id);
        self.next_plant_id += 1;
        id
    }

    pub(crate) fn alloc_grain_id(&mut self) -> GrainId {
        let id = GrainId(self.next_grain_id);
        self.next_grain_id += 1;
        id
    }

    pub(crate) fn alloc_colony_id(&mut self) -> ColonyId {
        let id = ColonyId(self.next_colony_id);
        self.next_colony_id += 1;
        id
    }

    /// On-demand fitness score for a live entity: weighted sum of survival,
    /// reproductive success, environmental fit, social contribution, and
    /// molecular (nutritional) adequacy. Never computed per tick.
    #[must_use]
    pub fn entity_fitness(&self, id: EntityId) -> Option<f64> {
        let e = self.entity(id)?;
        if !e.metabolism.alive {
            return None;
        }
        let m = &e.metabolism;
        let survival = (m.age as f64 / (m.max_age as f64 * 0.5)).min(1.0) * 0.5
            + (m.energy / m.energy_cap) * 0.5;
        let reproductive = (f64::from(m.offspring) / 5.0).min(1.0);

        let cell = self.grid.cell_at(&e.position);
        let environmental =
            1.0 - (crate::world::update::biome_stress(cell.biome, e) / 0.9).min(1.0);
        let molecular = f64::from(cell.soil.total() / 3.0).clamp(0.0, 1.0);

        let social = if e.caste.is_some() {
            0.8
        } else {
            f64::from(
                (e.traits.get(ecosphere_data::TraitId::Cooperation) + 1.0) / 4.0,
            )
        };

        Some(crate::genetics::fitness(&crate::genetics::FitnessInputs {
            survival,
            reproductive,
            environmental,
            social,
            molecular,
        }))
    }

    /// Stable digest of the dynamic state, for determinism verification.
    /// Two runs with the same seed and config produce identical digests at
    /// every tick.
    #[must_use]
    pub fn state_digest(&self) -> u64 {
        let mut h = Fnv1a::new();
        h.write_u64(self.clock.tick);
        for e in &self.entities {
            h.write_u64(e.identity.id.0);
            h.write_f64(e.position.x);
            h.write_f64(e.position.y);
            h.write_f64(e.velocity.vx);
            h.write_f64(e.velocity.vy);
            h.write_f64(e.metabolism.energy);
            h.write_u64(e.metabolism.age);
            h.write_u64(u64::from(e.metabolism.alive));
        }
        for p in &self.plants {
            h.write_u64(p.id.0);
            h.write_f64(p.energy);
            h.write_f64(f64::from(p.size));
        }
        for g in &self.grains {
            h.write_u64(g.id.0);
            h.write_f64(g.position.x);
            h.write_f64(g.position.y);
            h.write_f64(f64::from(g.viability));
        }
        h.write_u64(self.eggs.len() as u64);
        h.write_u64(self.colonies.len() as u64);
        h.write_u64(self.events.len() as u64);
        h.finish()
    }
}

/// Minimal FNV-1a accumulator; enough for state digests without pulling in
/// a hashing crate.
pub(crate) struct Fnv1a(u64);

impl Fnv1a {
    pub(crate) fn new() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }

    pub(crate) fn write_u64(&mut self, v: u64) {
        for byte in v.to_le_bytes() {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(0x1_0000_0000_01b3);
        }
    }

    pub(crate) fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    pub(crate) fn finish(&self) -> u64 {
        self.0
    }
}
