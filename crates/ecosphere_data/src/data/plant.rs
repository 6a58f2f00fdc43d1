use super::entity::{Position, SpeciesId};
use super::genome::Dna;
use super::traits::TraitVector;
use serde::{Deserialize, Serialize};

/// Unique plant identifier; monotonically allocated, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct PlantId(pub u64);

/// Plant form tags. Behavior tables in the engine (nutrient needs, water
/// dependency, link compatibility) are keyed by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlantType {
    Grass,
    Bush,
    Tree,
    Mushroom,
    Algae,
    Cactus,
    /// Aquatic variant.
    Kelp,
    /// Fungal ground-cover variant.
    Moss,
}

impl PlantType {
    pub const ALL: [PlantType; 8] = [
        PlantType::Grass,
        PlantType::Bush,
        PlantType::Tree,
        PlantType::Mushroom,
        PlantType::Algae,
        PlantType::Cactus,
        PlantType::Kelp,
        PlantType::Moss,
    ];

    #[must_use]
    pub fn is_aquatic(self) -> bool {
        matches!(self, PlantType::Algae | PlantType::Kelp)
    }

    #[must_use]
    pub fn is_fungal(self) -> bool {
        matches!(self, PlantType::Mushroom | PlantType::Moss)
    }
}

/// Per-type nutrient demand per growth step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NutrientNeeds {
    pub nitrogen: f32,
    pub phosphorus: f32,
    pub potassium: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: PlantId,
    pub kind: PlantType,
    pub species: SpeciesId,
    pub position: Position,
    pub size: f32,
    pub energy: f64,
    pub alive: bool,
    pub age: u64,
    pub dna: Dna,
    pub traits: TraitVector,
    /// Ticks until the plant may reproduce again.
    pub reproduction_timer: u32,
    /// Genetics deposited by a compatible grain; mixed into the next
    /// offspring, then cleared.
    pub pending_pollen: Option<Box<Dna>>,
}

/// Kind of connection between two networked plants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    Mycorrhizal,
    Root,
    Chemical,
}

/// State of one undirected plant-network link. Links are symmetric by
/// construction; endpoints must both be alive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkState {
    pub kind: LinkKind,
    pub strength: f32,
    pub health: f32,
    pub formed_tick: u64,
}

/// Chemical messages carried one hop per tick along network links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChemicalSignalKind {
    NutrientAvailable,
    NutrientNeeded,
    Threat,
    Growth,
    ReproductionReady,
    Toxic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChemicalSignal {
    pub kind: ChemicalSignalKind,
    pub origin: PlantId,
    pub strength: f32,
    pub emitted_tick: u64,
}
