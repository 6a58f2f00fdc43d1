use super::entity::{Position, SpeciesId, Velocity};
use super::genome::Dna;
use super::plant::{PlantId, PlantType};
use serde::{Deserialize, Serialize};

/// Unique grain identifier; monotonically allocated, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct GrainId(pub u64);

/// Transport mechanism chosen per seed based on its plant type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeedMechanism {
    /// Carried by wind only.
    Wind,
    /// Picked up and dropped by a passing entity.
    Animal,
    /// Ballistic ejection away from the parent.
    Explosive,
    /// Drifts along water cells.
    Water,
    /// Falls near the parent.
    Gravity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrainKind {
    Pollen,
    Seed(SeedMechanism),
}

/// Conditions a dormant seed needs before germinating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GerminationNeeds {
    pub min_temperature: f32,
    pub max_temperature: f32,
    pub min_moisture: f32,
    pub min_light: f32,
}

/// A Lagrangian unit of plant reproductive material in transit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grain {
    pub id: GrainId,
    pub kind: GrainKind,
    pub source_plant: PlantId,
    pub source_type: PlantType,
    pub species: SpeciesId,
    pub genetics: Dna,
    pub position: Position,
    pub velocity: Velocity,
    /// Remaining viability in [0, 1]; the grain is removed at zero.
    pub viability: f32,
    pub dormant: bool,
    pub needs: GerminationNeeds,
    pub released_tick: u64,
}

/// A seed resting in a cell's seed bank, waiting for germination conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankedSeed {
    pub source_type: PlantType,
    pub species: SpeciesId,
    pub genetics: Dna,
    pub viability: f32,
    pub needs: GerminationNeeds,
    pub banked_tick: u64,
}
