use super::traits::{TraitVector, TRAIT_COUNT};
use serde::{Deserialize, Serialize};

/// A single gene: one allele for one trait locus, with a dominance weight
/// controlling how strongly this allele contributes to expression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    /// Index into the trait vector this gene expresses.
    pub trait_index: u8,
    /// Allele value in [-1, 1] before mutation drift.
    pub allele: f32,
    /// Dominance weight in (0, 1]; higher dominates the paired allele.
    pub dominance: f32,
}

/// A fixed-length sequence of genes, one locus per trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromosome {
    pub genes: Vec<Gene>,
}

impl Chromosome {
    #[must_use]
    pub fn uniform(value: f32, dominance: f32) -> Self {
        let genes = (0..TRAIT_COUNT)
            .map(|i| Gene {
                trait_index: i as u8,
                allele: value,
                dominance,
            })
            .collect();
        Self { genes }
    }
}

/// Diploid genetic record: two chromosome sequences of identical length.
///
/// The expressed trait vector is a derived cache owned by the entity; it is
/// recomputed only when the DNA mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dna {
    pub chromosomes: [Chromosome; 2],
}

impl Dna {
    /// Expressed value per locus: dominance-weighted combination of the two
    /// alleles plus the per-trait baseline, clamped to the trait bounds.
    #[must_use]
    pub fn express(&self, baseline: &TraitVector) -> TraitVector {
        let mut out = TraitVector::default();
        let [a, b] = &self.chromosomes;
        for i in 0..TRAIT_COUNT.min(a.genes.len()).min(b.genes.len()) {
            let ga = &a.genes[i];
            let gb = &b.genes[i];
            let weight_sum = (ga.dominance + gb.dominance).max(1e-6);
            let value =
                (ga.allele * ga.dominance + gb.allele * gb.dominance) / weight_sum + baseline.0[i];
            out.0[i] = value.clamp(-TraitVector::BOUND, TraitVector::BOUND);
        }
        out
    }

    #[must_use]
    pub fn locus_count(&self) -> usize {
        self.chromosomes[0].genes.len()
    }

    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let [a, b] = &self.chromosomes;
        a.genes.len() == TRAIT_COUNT
            && b.genes.len() == TRAIT_COUNT
            && a.genes
                .iter()
                .chain(b.genes.iter())
                .all(|g| (g.trait_index as usize) < TRAIT_COUNT && g.allele.is_finite())
    }
}
