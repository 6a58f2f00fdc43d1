//! Shared helpers for the scenario suite.

use ecosphere_lib::data::{Chromosome, Classification, Dna, Position, SpeciesId, TraitId};
use ecosphere_lib::{SimConfig, World};

/// A small fast-settling config used by most scenarios.
pub fn base_config(seed: u64) -> SimConfig {
    let mut config = SimConfig::default();
    config.world.width = 50;
    config.world.height = 50;
    config.world.seed = seed;
    config.world.initial_entities = 0;
    config.world.initial_plants = 0;
    config
}

/// DNA with every allele at `value` (both chromosomes, equal dominance), so
/// the expressed trait vector is uniformly `value`.
pub fn uniform_dna(value: f32) -> Dna {
    Dna {
        chromosomes: [
            Chromosome::uniform(value, 0.5),
            Chromosome::uniform(value, 0.5),
        ],
    }
}

/// `uniform_dna` with individual trait overrides applied to both alleles.
pub fn dna_with(value: f32, overrides: &[(TraitId, f32)]) -> Dna {
    let mut dna = uniform_dna(value);
    for (trait_id, v) in overrides {
        for chromosome in &mut dna.chromosomes {
            chromosome.genes[trait_id.index()].allele = *v;
        }
    }
    dna
}

/// Register a fauna species and spawn a cluster of identical entities
/// around `center`, the first exactly at the center. Returns the species.
pub fn spawn_cluster(
    world: &mut World,
    dna: &Dna,
    classification: Classification,
    center: (f64, f64),
    count: usize,
    species: SpeciesId,
) {
    for i in 0..count {
        // Ring offsets spaced to avoid initial collisions.
        let position = if i == 0 {
            Position::new(center.0, center.1)
        } else {
            let angle = i as f64 * 2.399_963;
            let radius = 2.0 + (i as f64 * 0.25);
            Position::new(
                center.0 + angle.cos() * radius,
                center.1 + angle.sin() * radius,
            )
        };
        world.spawn_entity(
            dna.clone(),
            position,
            species,
            classification,
            0,
            None,
            None,
            100.0,
        );
    }
}
