//! World construction and initial seeding.

use super::World;
use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::events::EventBus;
use crate::genetics;
use crate::grid::{Biome, WorldGrid};
use crate::monitor::EcosystemMonitor;
use crate::mycorrhiza::PlantNetwork;
use crate::pressure::PressureSystem;
use crate::rng::{RngHub, StreamTag};
use crate::signals::SignalBoard;
use crate::society::warfare::DiplomacyTable;
use crate::species::{Realm, SpeciesRegistry};
use crate::wind::WindField;
use ecosphere_data::{
    Classification, Dna, Entity, EntityId, Identity, Metabolism, Plant, PlantId, PlantType,
    Position, ReproStatus, SpeciesId, TraitId, TraitVector, Velocity,
};
use rand::Rng;
use std::collections::HashMap;

impl World {
    /// Build an empty world from a validated configuration.
    pub fn new(config: SimConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let seed = config.world.seed;
        let grid = WorldGrid::generate(
            config.world.width,
            config.world.height,
            config.world.cell_size,
            seed,
        );
        let wind = WindField::new(
            config.world.width,
            config.world.height,
            config.world.cell_size,
            seed,
        );

        Ok(Self {
            clock: SimClock::default(),
            rng: RngHub::new(seed),
            grid,
            wind,
            entities: Vec::new(),
            plants: Vec::new(),
            grains: Vec::new(),
            eggs: Vec::new(),
            decay_items: Vec::new(),
            colonies: Vec::new(),
            conflicts: Vec::new(),
            network: PlantNetwork::new(),
            species: SpeciesRegistry::new(),
            pressures: PressureSystem::default(),
            signals: SignalBoard::default(),
            diplomacy: DiplomacyTable::default(),
            events: EventBus::new(),
            monitor: EcosystemMonitor::new(),
            next_entity_id: 0,
            next_plant_id: 0,
            next_grain_id: 0,
            next_egg_id: 0,
            next_colony_id: 0,
            entity_index: HashMap::new(),
            plant_index: HashMap::new(),
            removed_entities: 0,
            config,
        })
    }

    /// Build a world and seed the configured initial populations.
    pub fn new_seeded(config: SimConfig) -> anyhow::Result<Self> {
        let mut world = Self::new(config)?;
        world.seed_initial_populations();
        Ok(world)
    }

    /// Seed the configured number of entities and plants across the map.
    pub fn seed_initial_populations(&mut self) {
        let mut rng = self.rng.stream(0, StreamTag::Seeding);
        let width = f64::from(self.config.world.width);
        let height = f64::from(self.config.world.height);

        let fauna_species =
            self.species
                .found(Realm::Fauna, "fauna-0", TraitVector::default(), None, 0);

        for _ in 0..self.config.world.initial_entities {
            let position = Position::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height));
            let dna = genetics::random_dna(&mut rng);
            let classification = random_classification(&mut rng);
            self.spawn_entity(dna, position, fauna_species, classification, 0, None, None, 100.0);
        }

        // One founding flora species per plant type present at seeding.
        let mut flora_species: HashMap<PlantType, SpeciesId> = HashMap::new();
        for _ in 0..self.config.world.initial_plants {
            let position = Position::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height));
            let kind = plant_type_for_biome(self.grid.cell_at(&position).biome, &mut rng);
            let species = *flora_species.entry(kind).or_insert_with(|| {
                self.species.found(
                    Realm::Flora,
                    format!("flora-{:?}", kind).to_lowercase(),
                    TraitVector::default(),
                    None,
                    0,
                )
            });
            let dna = genetics::random_dna(&mut rng);
            self.spawn_plant(kind, dna, position, species);
        }
    }

    /// Spawn a new entity; returns None when the population cap is reached.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn_entity(
        &mut self,
        dna: Dna,
        position: Position,
        species: SpeciesId,
        classification: Classification,
        generation: u32,
        parent_a: Option<EntityId>,
        parent_b: Option<EntityId>,
        energy: f64,
    ) -> Option<EntityId> {
        if self.entities.len() >= self.config.world.max_entities {
            return None;
        }
        let id = self.alloc_entity_id();
        let position = self.grid.clamp_position(position);
        let traits = genetics::express(&dna);
        let energy_cap = 150.0 + 100.0 * f64::from(traits.get(TraitId::Size) + 1.0);
        let max_age = (600.0 + 500.0 * f64::from(traits.get(TraitId::Lifespan) + 1.0)) as u64;

        let entity = Entity {
            identity: Identity {
                id,
                species,
                generation,
                parent_a,
                parent_b,
            },
            position,
            velocity: Velocity::default(),
            metabolism: Metabolism::new(energy.min(energy_cap), energy_cap, max_age),
            dna,
            traits,
            classification,
            reproduction: ReproStatus::Ready,
            caste: None,
            brain: None,
        };

        self.grid.insert_entity(id, &position);
        self.entity_index.insert(id, self.entities.len());
        self.entities.push(entity);
        Some(id)
    }

    /// Spawn a new plant; returns None when the plant cap is reached.
    pub fn spawn_plant(
        &mut self,
        kind: PlantType,
        dna: Dna,
        position: Position,
        species: SpeciesId,
    ) -> Option<PlantId> {
        if self.plants.len() >= self.config.world.max_plants {
            return None;
        }
        let id = self.alloc_plant_id();
        let position = self.grid.clamp_position(position);
        let traits = genetics::express(&dna);

        let plant = Plant {
            id,
            kind,
            species,
            position,
            size: 0.1,
            energy: 5.0,
            alive: true,
            age: 0,
            dna,
            traits,
            reproduction_timer: 0,
            pending_pollen: None,
        };

        self.grid.insert_plant(id, &position);
        self.network.add_plant(id);
        self.plant_index.insert(id, self.plants.len());
        self.plants.push(plant);
        Some(id)
    }
}

fn random_classification<R: Rng>(rng: &mut R) -> Classification {
    match rng.gen_range(0..10) {
        0 => Classification::Microbe,
        1..=4 => Classification::Herbivore,
        5..=6 => Classification::Carnivore,
        7..=8 => Classification::Omnivore,
        _ => Classification::Decomposer,
    }
}

fn plant_type_for_biome<R: Rng>(biome: Biome, rng: &mut R) -> PlantType {
    let options: &[PlantType] = match biome {
        Biome::Water => &[PlantType::Algae, PlantType::Kelp],
        Biome::Wetland => &[PlantType::Algae, PlantType::Moss, PlantType::Grass],
        Biome::Desert => &[PlantType::Cactus, PlantType::Grass],
        Biome::Forest => &[PlantType::Tree, PlantType::Bush, PlantType::Mushroom],
        Biome::Mountain => &[PlantType::Moss, PlantType::Bush],
        Biome::Tundra => &[PlantType::Moss, PlantType::Grass],
        Biome::Plains => &[PlantType::Grass, PlantType::Bush, PlantType::Tree],
    };
    options[rng.gen_range(0..options.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_world_matches_config() {
        let mut config = SimConfig::default();
        config.world.initial_entities = 20;
        config.world.initial_plants = 30;
        config.world.seed = 5;
        let world = World::new_seeded(config).unwrap();

        assert_eq!(world.entities.len(), 20);
        assert_eq!(world.plants.len(), 30);
        assert!(world.species.records.len() >= 2);
        // Entities are sorted by id and indexed.
        for (i, e) in world.entities.iter().enumerate() {
            assert_eq!(world.entity_index[&e.identity.id], i);
        }
    }

    #[test]
    fn seeding_is_deterministic() {
        let mut config = SimConfig::default();
        config.world.seed = 11;
        let a = World::new_seeded(config.clone()).unwrap();
        let b = World::new_seeded(config).unwrap();
        assert_eq!(a.state_digest(), b.state_digest());
    }

    #[test]
    fn spawn_respects_population_cap() {
        let mut config = SimConfig::default();
        config.world.initial_entities = 0;
        config.world.initial_plants = 0;
        config.world.max_entities = 2;
        let mut world = World::new_seeded(config).unwrap();
        let mut rng = world.rng.stream(0, StreamTag::Seeding);

        let species = world.species.found(
            Realm::Fauna,
            "fauna-0",
            TraitVector::default(),
            None,
            0,
        );
        for i in 0..3 {
            let dna = genetics::random_dna(&mut rng);
            let spawned = world.spawn_entity(
                dna,
                Position::new(5.0, 5.0),
                species,
                Classification::Omnivore,
                0,
                None,
                None,
                100.0,
            );
            assert_eq!(spawned.is_some(), i < 2);
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimConfig::default();
        config.world.width = 0;
        assert!(World::new(config).is_err());
    }
}
