//! Heritable genetics: random DNA, dominance-weighted expression, mutation
//! with environmental bias, uniform crossover, and the on-demand fitness
//! score.

use crate::config::GeneticsConfig;
use ecosphere_data::{Chromosome, Dna, Gene, TraitVector, TRAIT_COUNT};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed fitness weights: survival, reproduction, environmental fit,
/// social contribution, molecular adequacy.
pub const FITNESS_WEIGHTS: [f64; 5] = [0.30, 0.25, 0.20, 0.10, 0.15];

/// Additive per-trait mean shift applied to mutation steps, produced by the
/// environmental-pressure phase. Each component is bounded by the configured
/// cap (|0.1| by default).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MutationBias(pub [f32; TRAIT_COUNT]);

impl MutationBias {
    pub fn clamp_to(&mut self, cap: f32) {
        for v in &mut self.0 {
            *v = v.clamp(-cap, cap);
        }
    }
}

/// Standard normal sample via Box–Muller; avoids a zero argument to `ln`.
pub fn gaussian<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

/// Random diploid DNA with alleles in [-1, 1] and dominance in (0, 1].
#[must_use]
pub fn random_dna<R: Rng>(rng: &mut R) -> Dna {
    let make_chromosome = |rng: &mut R| Chromosome {
        genes: (0..TRAIT_COUNT)
            .map(|i| Gene {
                trait_index: i as u8,
                allele: rng.gen_range(-1.0..1.0),
                dominance: rng.gen_range(0.1..=1.0),
            })
            .collect(),
    };
    Dna {
        chromosomes: [make_chromosome(rng), make_chromosome(rng)],
    }
}

/// Expressed trait vector with the engine's zero baseline.
#[must_use]
pub fn express(dna: &Dna) -> TraitVector {
    dna.express(&TraitVector::default())
}

/// Mutate each gene independently with probability `mutation_rate`.
///
/// The step is Gaussian, scaled by `mutation_strength` and shifted by the
/// pressure bias for the gene's trait. Returns true when any allele changed,
/// signalling that the expression cache must be recomputed.
pub fn mutate_dna<R: Rng>(
    dna: &mut Dna,
    config: &GeneticsConfig,
    bias: &MutationBias,
    rate_multiplier: f32,
    rng: &mut R,
) -> bool {
    let rate = (config.mutation_rate * rate_multiplier).clamp(0.0, 1.0);
    let mut changed = false;
    for chromosome in &mut dna.chromosomes {
        for gene in &mut chromosome.genes {
            if rng.gen::<f32>() >= rate {
                continue;
            }
            let shift = bias.0[gene.trait_index as usize];
            let step = gaussian(rng) * config.mutation_strength + shift;
            gene.allele = (gene.allele + step).clamp(-TraitVector::BOUND, TraitVector::BOUND);
            if rng.gen::<f32>() < 0.1 {
                gene.dominance = (gene.dominance + gaussian(rng) * 0.05).clamp(0.05, 1.0);
            }
            changed = true;
        }
    }
    changed
}

/// Uniform crossover: each offspring chromosome picks, per locus, one
/// parental allele at random. Chromosome 0 draws from parent `a`, chromosome
/// 1 from parent `b`, preserving diploidy.
#[must_use]
pub fn crossover<R: Rng>(a: &Dna, b: &Dna, rng: &mut R) -> Dna {
    let pick = |parent: &Dna, rng: &mut R| -> Chromosome {
        let genes = (0..TRAIT_COUNT)
            .map(|i| {
                let which = usize::from(rng.gen::<bool>());
                parent.chromosomes[which].genes[i]
            })
            .collect();
        Chromosome { genes }
    };
    Dna {
        chromosomes: [pick(a, rng), pick(b, rng)],
    }
}

/// Component scores feeding the weighted fitness sum, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FitnessInputs {
    pub survival: f64,
    pub reproductive: f64,
    pub environmental: f64,
    pub social: f64,
    pub molecular: f64,
}

/// Weighted fitness score in [0, 1]; computed on demand, never per tick.
#[must_use]
pub fn fitness(inputs: &FitnessInputs) -> f64 {
    let components = [
        inputs.survival,
        inputs.reproductive,
        inputs.environmental,
        inputs.social,
        inputs.molecular,
    ];
    components
        .iter()
        .zip(FITNESS_WEIGHTS.iter())
        .map(|(c, w)| c.clamp(0.0, 1.0) * w)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn random_dna_is_well_formed() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let dna = random_dna(&mut rng);
        assert!(dna.is_well_formed());
        assert_eq!(dna.locus_count(), TRAIT_COUNT);
    }

    #[test]
    fn mutation_respects_trait_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let config = GeneticsConfig {
            mutation_rate: 1.0,
            mutation_strength: 5.0,
            ..Default::default()
        };
        let mut dna = random_dna(&mut rng);
        mutate_dna(&mut dna, &config, &MutationBias::default(), 1.0, &mut rng);
        for chromosome in &dna.chromosomes {
            for gene in &chromosome.genes {
                assert!((-TraitVector::BOUND..=TraitVector::BOUND).contains(&gene.allele));
            }
        }
        assert!(express(&dna).in_bounds());
    }

    #[test]
    fn zero_rate_never_mutates() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let config = GeneticsConfig {
            mutation_rate: 0.0,
            ..Default::default()
        };
        let mut dna = random_dna(&mut rng);
        let before = dna.clone();
        let changed = mutate_dna(&mut dna, &config, &MutationBias::default(), 1.0, &mut rng);
        assert!(!changed);
        assert_eq!(dna, before);
    }

    #[test]
    fn bias_shifts_mutation_mean() {
        let config = GeneticsConfig {
            mutation_rate: 1.0,
            mutation_strength: 0.05,
            ..Default::default()
        };
        let mut bias = MutationBias::default();
        bias.0[0] = 0.1;

        let mut total_shift = 0.0f32;
        let runs = 200;
        for seed in 0..runs {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut dna = random_dna(&mut rng);
            let before = dna.chromosomes[0].genes[0].allele;
            mutate_dna(&mut dna, &config, &bias, 1.0, &mut rng);
            total_shift += dna.chromosomes[0].genes[0].allele - before;
        }
        // Positive bias on trait 0 pushes the mean step above zero.
        assert!(total_shift / runs as f32 > 0.02);
    }

    #[test]
    fn crossover_takes_alleles_from_each_parent() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let a = Dna {
            chromosomes: [Chromosome::uniform(0.5, 0.5), Chromosome::uniform(0.5, 0.5)],
        };
        let b = Dna {
            chromosomes: [
                Chromosome::uniform(-0.5, 0.5),
                Chromosome::uniform(-0.5, 0.5),
            ],
        };
        let child = crossover(&a, &b, &mut rng);
        for gene in &child.chromosomes[0].genes {
            assert!((gene.allele - 0.5).abs() < 1e-6);
        }
        for gene in &child.chromosomes[1].genes {
            assert!((gene.allele + 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn fitness_uses_fixed_weights() {
        let perfect = FitnessInputs {
            survival: 1.0,
            reproductive: 1.0,
            environmental: 1.0,
            social: 1.0,
            molecular: 1.0,
        };
        assert!((fitness(&perfect) - 1.0).abs() < 1e-12);

        let survival_only = FitnessInputs {
            survival: 1.0,
            ..Default::default()
        };
        assert!((fitness(&survival_only) - 0.30).abs() < 1e-12);
    }
}
