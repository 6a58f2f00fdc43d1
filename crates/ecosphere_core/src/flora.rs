//! Plant growth and reproduction, driven by per-type behavior tables.
//!
//! Each [`PlantType`] tag maps to a static profile (nutrient needs, water
//! dependency, reproduction thresholds, dispersal mechanism); adding a type
//! means one enum variant plus one table entry.

use crate::clock::Season;
use crate::config::FloraConfig;
use crate::grid::Cell;
use ecosphere_data::{GerminationNeeds, NutrientNeeds, Plant, PlantType, SeedMechanism};

/// Static per-type behavior table entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantProfile {
    pub needs: NutrientNeeds,
    pub water_need: f32,
    /// Energy gained per successful growth step.
    pub growth_energy: f64,
    pub max_size: f32,
    pub reproduction_threshold: f64,
    pub reproduction_cooldown: u32,
    /// Per-tick viability loss of released grains.
    pub viability_decay: f32,
    pub germination: GerminationNeeds,
    pub mechanism: SeedMechanism,
    /// Fraction of reproduction events that release pollen rather than bud.
    pub pollen_fraction: f32,
}

#[must_use]
pub fn profile(kind: PlantType) -> &'static PlantProfile {
    match kind {
        PlantType::Grass => &GRASS,
        PlantType::Bush => &BUSH,
        PlantType::Tree => &TREE,
        PlantType::Mushroom => &MUSHROOM,
        PlantType::Algae => &ALGAE,
        PlantType::Cactus => &CACTUS,
        PlantType::Kelp => &KELP,
        PlantType::Moss => &MOSS,
    }
}

const fn needs(n: f32, p: f32, k: f32) -> NutrientNeeds {
    NutrientNeeds {
        nitrogen: n,
        phosphorus: p,
        potassium: k,
    }
}

const fn germination(min_t: f32, max_t: f32, moisture: f32, light: f32) -> GerminationNeeds {
    GerminationNeeds {
        min_temperature: min_t,
        max_temperature: max_t,
        min_moisture: moisture,
        min_light: light,
    }
}

static GRASS: PlantProfile = PlantProfile {
    needs: needs(0.02, 0.01, 0.01),
    water_need: 0.2,
    growth_energy: 4.0,
    max_size: 1.0,
    reproduction_threshold: 40.0,
    reproduction_cooldown: 60,
    viability_decay: 0.02,
    germination: germination(5.0, 35.0, 0.15, 0.3),
    mechanism: SeedMechanism::Wind,
    pollen_fraction: 0.8,
};

static BUSH: PlantProfile = PlantProfile {
    needs: needs(0.03, 0.02, 0.02),
    water_need: 0.3,
    growth_energy: 5.0,
    max_size: 2.0,
    reproduction_threshold: 70.0,
    reproduction_cooldown: 120,
    viability_decay: 0.015,
    germination: germination(8.0, 32.0, 0.2, 0.4),
    mechanism: SeedMechanism::Animal,
    pollen_fraction: 0.6,
};

static TREE: PlantProfile = PlantProfile {
    needs: needs(0.05, 0.03, 0.03),
    water_need: 0.4,
    growth_energy: 7.0,
    max_size: 5.0,
    reproduction_threshold: 140.0,
    reproduction_cooldown: 300,
    viability_decay: 0.01,
    germination: germination(6.0, 30.0, 0.25, 0.5),
    mechanism: SeedMechanism::Gravity,
    pollen_fraction: 0.7,
};

static MUSHROOM: PlantProfile = PlantProfile {
    needs: needs(0.01, 0.02, 0.01),
    water_need: 0.5,
    growth_energy: 3.0,
    max_size: 0.6,
    reproduction_threshold: 25.0,
    reproduction_cooldown: 40,
    viability_decay: 0.04,
    germination: germination(4.0, 26.0, 0.4, 0.0),
    mechanism: SeedMechanism::Wind,
    pollen_fraction: 0.9,
};

static ALGAE: PlantProfile = PlantProfile {
    needs: needs(0.015, 0.01, 0.005),
    water_need: 0.85,
    growth_energy: 3.5,
    max_size: 0.5,
    reproduction_threshold: 20.0,
    reproduction_cooldown: 30,
    viability_decay: 0.05,
    germination: germination(2.0, 28.0, 0.8, 0.2),
    mechanism: SeedMechanism::Water,
    pollen_fraction: 0.5,
};

static CACTUS: PlantProfile = PlantProfile {
    needs: needs(0.01, 0.01, 0.02),
    water_need: 0.02,
    growth_energy: 2.5,
    max_size: 1.5,
    reproduction_threshold: 60.0,
    reproduction_cooldown: 240,
    viability_decay: 0.008,
    germination: germination(15.0, 45.0, 0.05, 0.6),
    mechanism: SeedMechanism::Explosive,
    pollen_fraction: 0.4,
};

static KELP: PlantProfile = PlantProfile {
    needs: needs(0.02, 0.015, 0.01),
    water_need: 0.95,
    growth_energy: 5.0,
    max_size: 3.0,
    reproduction_threshold: 60.0,
    reproduction_cooldown: 90,
    viability_decay: 0.03,
    germination: germination(1.0, 24.0, 0.9, 0.1),
    mechanism: SeedMechanism::Water,
    pollen_fraction: 0.5,
};

static MOSS: PlantProfile = PlantProfile {
    needs: needs(0.008, 0.005, 0.005),
    water_need: 0.45,
    growth_energy: 2.0,
    max_size: 0.3,
    reproduction_threshold: 15.0,
    reproduction_cooldown: 50,
    viability_decay: 0.04,
    germination: germination(0.0, 22.0, 0.35, 0.1),
    mechanism: SeedMechanism::Wind,
    pollen_fraction: 0.9,
};

/// Fixed type-pair compatibility for mycorrhizal linking.
#[must_use]
pub fn link_compatible(a: PlantType, b: PlantType) -> bool {
    use PlantType::*;
    if a == b {
        return true;
    }
    // Fungal types bridge everything terrestrial; aquatic types only pair
    // with each other.
    match (a, b) {
        (Mushroom | Moss, x) | (x, Mushroom | Moss) => !x.is_aquatic(),
        (Algae, Kelp) | (Kelp, Algae) => true,
        (Grass, Bush) | (Bush, Grass) => true,
        (Bush, Tree) | (Tree, Bush) => true,
        (Grass, Tree) | (Tree, Grass) => true,
        _ => false,
    }
}

/// Nutrients actually consumed by one growth attempt, for the conservation
/// ledger.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Uptake {
    pub nitrogen: f32,
    pub phosphorus: f32,
    pub potassium: f32,
}

impl Uptake {
    #[must_use]
    pub fn total(&self) -> f32 {
        self.nitrogen + self.phosphorus + self.potassium
    }
}

/// Grow one plant against its cell: when soil and water cover the per-type
/// needs, withdraw nutrients, store energy, and advance size toward the
/// type's maximum. Returns the uptake (zero if the cell was too poor).
pub fn grow(plant: &mut Plant, cell: &mut Cell, season: Season, config: &FloraConfig) -> Uptake {
    let profile = profile(plant.kind);

    if plant.reproduction_timer > 0 {
        plant.reproduction_timer -= 1;
    }
    plant.age += 1;

    let water_ok = cell.water >= profile.water_need;
    let soil_ok = cell.soil.nitrogen >= profile.needs.nitrogen
        && cell.soil.phosphorus >= profile.needs.phosphorus
        && cell.soil.potassium >= profile.needs.potassium;

    if !water_ok || !soil_ok {
        // Starving plants burn reserves.
        plant.energy = (plant.energy - 0.5).max(0.0);
        if plant.energy <= 0.0 && plant.size < 0.05 {
            plant.alive = false;
        }
        return Uptake::default();
    }

    let taken = cell.soil.withdraw(
        profile.needs.nitrogen,
        profile.needs.phosphorus,
        profile.needs.potassium,
    );

    let season_mult = season.growth_multiplier();
    plant.energy += profile.growth_energy * season_mult;
    let growth = config.growth_rate * season_mult as f32;
    plant.size = (plant.size + growth).min(profile.max_size);

    Uptake {
        nitrogen: taken.nitrogen,
        phosphorus: taken.phosphorus,
        potassium: taken.potassium,
    }
}

/// What a reproduction-ready plant does this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReproductionAction {
    ReleasePollen,
    ReleaseSeed,
    Bud,
}

/// Decide whether (and how) a plant reproduces. `roll` is a uniform sample
/// from the flora stream in [0, 1).
#[must_use]
pub fn reproduction_action(plant: &Plant, season: Season, roll: f32) -> Option<ReproductionAction> {
    let profile = profile(plant.kind);
    if !plant.alive
        || plant.reproduction_timer > 0
        || plant.energy < profile.reproduction_threshold
    {
        return None;
    }
    if season.growth_multiplier() < 0.5 {
        return None;
    }
    if roll < profile.pollen_fraction {
        Some(ReproductionAction::ReleasePollen)
    } else if roll < profile.pollen_fraction + (1.0 - profile.pollen_fraction) * 0.5 {
        Some(ReproductionAction::ReleaseSeed)
    } else {
        Some(ReproductionAction::Bud)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Biome;
    use ecosphere_data::{Chromosome, Dna, PlantId, Position, SpeciesId, TraitVector};

    fn test_plant(kind: PlantType) -> Plant {
        Plant {
            id: PlantId(1),
            kind,
            species: SpeciesId(0),
            position: Position::new(5.0, 5.0),
            size: 0.5,
            energy: 10.0,
            alive: true,
            age: 0,
            dna: Dna {
                chromosomes: [Chromosome::uniform(0.0, 0.5), Chromosome::uniform(0.0, 0.5)],
            },
            traits: TraitVector::default(),
            reproduction_timer: 0,
            pending_pollen: None,
        }
    }

    fn rich_cell() -> Cell {
        let mut cell = crate::grid::WorldGrid::generate(8, 8, 4.0, 1).cells[0].clone();
        cell.biome = Biome::Plains;
        cell.soil.nitrogen = 1.0;
        cell.soil.phosphorus = 1.0;
        cell.soil.potassium = 1.0;
        cell.water = 0.5;
        cell
    }

    #[test]
    fn growth_withdraws_what_it_reports() {
        let mut plant = test_plant(PlantType::Grass);
        let mut cell = rich_cell();
        let before = cell.soil.total();
        let uptake = grow(&mut plant, &mut cell, Season::Spring, &FloraConfig::default());
        assert!(uptake.total() > 0.0);
        assert!((before - cell.soil.total() - uptake.total()).abs() < 1e-6);
        assert!(plant.energy > 10.0);
    }

    #[test]
    fn dry_cell_starves_the_plant() {
        let mut plant = test_plant(PlantType::Tree);
        let mut cell = rich_cell();
        cell.water = 0.0;
        let energy_before = plant.energy;
        let uptake = grow(&mut plant, &mut cell, Season::Spring, &FloraConfig::default());
        assert_eq!(uptake.total(), 0.0);
        assert!(plant.energy < energy_before);
    }

    #[test]
    fn winter_suppresses_reproduction() {
        let mut plant = test_plant(PlantType::Grass);
        plant.energy = 1000.0;
        assert!(reproduction_action(&plant, Season::Winter, 0.1).is_none());
        assert!(reproduction_action(&plant, Season::Spring, 0.1).is_some());
    }

    #[test]
    fn reproduction_needs_energy_and_cooldown() {
        let mut plant = test_plant(PlantType::Grass);
        plant.energy = 5.0;
        assert!(reproduction_action(&plant, Season::Spring, 0.1).is_none());
        plant.energy = 1000.0;
        plant.reproduction_timer = 10;
        assert!(reproduction_action(&plant, Season::Spring, 0.1).is_none());
    }

    #[test]
    fn compatibility_matrix_is_symmetric() {
        for a in PlantType::ALL {
            for b in PlantType::ALL {
                assert_eq!(link_compatible(a, b), link_compatible(b, a));
            }
        }
        assert!(link_compatible(PlantType::Mushroom, PlantType::Tree));
        assert!(!link_compatible(PlantType::Mushroom, PlantType::Algae));
        assert!(!link_compatible(PlantType::Cactus, PlantType::Kelp));
    }
}
