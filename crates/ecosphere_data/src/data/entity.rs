use super::brain::Brain;
use super::genome::Dna;
use super::traits::TraitVector;
use serde::{Deserialize, Serialize};

/// Unique entity identifier; monotonically allocated, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct EntityId(pub u64);

/// Interned species tag; names live in the species registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SpeciesId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    #[must_use]
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    #[inline]
    #[must_use]
    pub fn distance_sq(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    #[inline]
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: EntityId,
    pub species: SpeciesId,
    pub generation: u32,
    pub parent_a: Option<EntityId>,
    pub parent_b: Option<EntityId>,
}

/// Energy and aging state. `alive` flips once; the record lingers for one
/// tick as a corpse before the decay phase removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metabolism {
    pub energy: f64,
    pub energy_cap: f64,
    pub age: u64,
    pub max_age: u64,
    pub alive: bool,
    pub died_tick: Option<u64>,
    /// Offspring produced, feeding the reproductive-success fitness term.
    pub offspring: u32,
}

impl Metabolism {
    #[must_use]
    pub fn new(energy: f64, energy_cap: f64, max_age: u64) -> Self {
        Self {
            energy,
            energy_cap,
            age: 0,
            max_age,
            alive: true,
            died_tick: None,
            offspring: 0,
        }
    }
}

/// Broad trophic classification deciding maturity age and the default
/// reproduction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Microbe,
    Herbivore,
    Carnivore,
    Omnivore,
    Decomposer,
}

impl Classification {
    #[must_use]
    pub fn maturity_age(self) -> u64 {
        match self {
            Classification::Microbe => 10,
            Classification::Herbivore => 60,
            Classification::Carnivore => 90,
            Classification::Omnivore => 80,
            Classification::Decomposer => 30,
        }
    }

    #[must_use]
    pub fn default_mode(self) -> ReproductionMode {
        match self {
            Classification::Microbe => ReproductionMode::Fission,
            Classification::Herbivore => ReproductionMode::Egg,
            Classification::Carnivore => ReproductionMode::LiveBirth,
            Classification::Omnivore => ReproductionMode::Direct,
            Classification::Decomposer => ReproductionMode::Budding,
        }
    }
}

/// Reproduction strategy tags; behavior tables in the engine map each tag to
/// its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReproductionMode {
    Direct,
    Egg,
    LiveBirth,
    Budding,
    Fission,
}

/// Reproductive state machine advanced once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum ReproStatus {
    #[default]
    Ready,
    /// Post-reproduction refractory period.
    Cooldown { until_tick: u64 },
    /// Live-birth pregnancy; `timer` counts up to `gestation_period`.
    Gestating {
        timer: u32,
        gestation_period: u32,
        brood: u8,
        partner_dna: Box<Dna>,
        partner: EntityId,
    },
}

/// Caste membership for colony entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasteStatus {
    pub colony: super::colony::ColonyId,
    pub role: super::colony::CasteRole,
    /// Tick the role was assigned; trait modifiers are applied exactly once.
    pub assigned_tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub identity: Identity,
    pub position: Position,
    pub velocity: Velocity,
    pub metabolism: Metabolism,
    pub dna: Dna,
    /// Derived expression cache; recomputed only when DNA mutates.
    pub traits: TraitVector,
    pub classification: Classification,
    pub reproduction: ReproStatus,
    pub caste: Option<CasteStatus>,
    pub brain: Option<Box<Brain>>,
}

impl Entity {
    /// Body radius for collision tests, derived from the size trait.
    #[must_use]
    pub fn radius(&self) -> f64 {
        0.5 + 0.25 * (self.traits.get(super::traits::TraitId::Size) as f64 + 1.0)
    }

    /// Collision mass, scaling with body radius.
    #[must_use]
    pub fn mass(&self) -> f64 {
        let r = self.radius();
        r * r
    }
}

/// An unhatched egg owned by the world. `timer` counts up toward
/// `hatch_period`; the hatch transition fires exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Egg {
    pub id: u64,
    pub parent: EntityId,
    pub species: SpeciesId,
    pub position: Position,
    pub dna: Dna,
    pub generation: u32,
    pub timer: u32,
    pub hatch_period: u32,
    pub energy_share: f64,
}

/// A decaying corpse releasing nutrients into the underlying cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayItem {
    pub source: EntityId,
    pub position: Position,
    pub nutrients_remaining: f32,
    pub organic_remaining: f32,
    pub timer: u32,
    pub decay_period: u32,
}

#[cfg(test)]
mod tests {
    use super::super::genome::Chromosome;
    use super::*;

    fn dummy_entity() -> Entity {
        Entity {
            identity: Identity {
                id: EntityId(1),
                species: SpeciesId(0),
                generation: 0,
                parent_a: None,
                parent_b: None,
            },
            position: Position::new(1.0, 2.0),
            velocity: Velocity::default(),
            metabolism: Metabolism::new(100.0, 200.0, 1000),
            dna: Dna {
                chromosomes: [Chromosome::uniform(0.0, 0.5), Chromosome::uniform(0.0, 0.5)],
            },
            traits: TraitVector::default(),
            classification: Classification::Omnivore,
            reproduction: ReproStatus::Ready,
            caste: None,
            brain: None,
        }
    }

    #[test]
    fn radius_grows_with_size_trait() {
        let mut e = dummy_entity();
        let base = e.radius();
        e.traits.set(super::super::traits::TraitId::Size, 1.0);
        assert!(e.radius() > base);
    }

    #[test]
    fn position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
