//! Mating eligibility, the five reproduction modes, and corpse decay.
//!
//! Gestation and egg hatching are small state machines on the entity and
//! egg records (`timer` counting toward a threshold); each tick advances
//! timers and fires transitions exactly once.

use crate::clock::Season;
use crate::config::{GeneticsConfig, ReproductionConfig};
use crate::genetics::{self, MutationBias};
use crate::grid::Cell;
use ecosphere_data::{DecayItem, Dna, Entity, ReproStatus, ReproductionMode, TraitId};
use rand::Rng;

#[must_use]
pub fn is_mature(entity: &Entity) -> bool {
    entity.metabolism.age >= entity.classification.maturity_age()
}

/// Energy floor for mating, scaled by season (higher in winter).
#[must_use]
pub fn mating_energy_floor(entity: &Entity, config: &ReproductionConfig, season: Season) -> f64 {
    entity.metabolism.energy_cap * config.energy_threshold_fraction * season.breeding_multiplier()
}

/// The reproduction mode an entity uses: classification default, with high
/// fertility favoring broods over fission.
#[must_use]
pub fn mode_of(entity: &Entity) -> ReproductionMode {
    let base = entity.classification.default_mode();
    if base == ReproductionMode::Fission && entity.traits.get(TraitId::Fertility) > 0.8 {
        ReproductionMode::Budding
    } else {
        base
    }
}

/// Mating eligibility for one partner.
#[must_use]
pub fn eligible(entity: &Entity, config: &ReproductionConfig, season: Season) -> bool {
    entity.metabolism.alive
        && is_mature(entity)
        && matches!(entity.reproduction, ReproStatus::Ready)
        && entity.metabolism.energy >= mating_energy_floor(entity, config, season)
}

/// Cross-species compatibility: same species always passes; otherwise the
/// base allow-rate is modulated by genetic similarity and rolled once.
#[must_use]
pub fn compatible<R: Rng>(
    a: &Entity,
    b: &Entity,
    config: &ReproductionConfig,
    rng: &mut R,
) -> bool {
    if a.identity.species == b.identity.species {
        return true;
    }
    let distance = a.traits.distance(&b.traits);
    let similarity = (1.0 - distance / 2.0).clamp(0.0, 1.0);
    let rate = config.cross_species_base_rate * similarity * similarity;
    rng.gen::<f32>() < rate
}

/// Offspring DNA: uniform crossover then per-gene mutation.
#[must_use]
pub fn offspring_dna<R: Rng>(
    a: &Dna,
    b: &Dna,
    genetics_config: &GeneticsConfig,
    bias: &MutationBias,
    rng: &mut R,
) -> Dna {
    let mut child = genetics::crossover(a, b, rng);
    genetics::mutate_dna(&mut child, genetics_config, bias, 1.0, rng);
    child
}

/// Clone-with-mutation DNA for budding and fission.
#[must_use]
pub fn clone_dna<R: Rng>(
    parent: &Dna,
    genetics_config: &GeneticsConfig,
    bias: &MutationBias,
    rng: &mut R,
) -> Dna {
    let mut child = parent.clone();
    genetics::mutate_dna(&mut child, genetics_config, bias, 1.0, rng);
    child
}

/// Live-birth brood size: 1-3 offspring.
#[must_use]
pub fn brood_size<R: Rng>(rng: &mut R) -> u8 {
    rng.gen_range(1..=3)
}

/// Build the decay item left behind by a corpse; nutrient value scales with
/// body size.
#[must_use]
pub fn corpse_decay_item(entity: &Entity, config: &ReproductionConfig) -> DecayItem {
    let size = entity.traits.get(TraitId::Size) + 1.5; // in (0.5, 3.5]
    DecayItem {
        source: entity.identity.id,
        position: entity.position,
        nutrients_remaining: size * 2.0,
        organic_remaining: size,
        timer: 0,
        decay_period: config.decay_period,
    }
}

/// Advance one decay item a tick: diffuse a proportional share of the
/// remaining nutrients into the cell (fungal decomposers accelerate), and
/// report whether the item is exhausted. Returns nutrients released.
pub fn decay_step(item: &mut DecayItem, cell: &mut Cell, fungal_present: bool) -> f32 {
    item.timer += 1;
    let remaining_ticks = item.decay_period.saturating_sub(item.timer - 1).max(1);
    let mut share = item.nutrients_remaining / remaining_ticks as f32;
    let mut organic_share = item.organic_remaining / remaining_ticks as f32;
    if fungal_present {
        share = (share * 1.5).min(item.nutrients_remaining);
        organic_share = (organic_share * 1.5).min(item.organic_remaining);
    }

    item.nutrients_remaining -= share;
    item.organic_remaining -= organic_share;
    cell.soil.deposit(share);
    cell.organic_matter += organic_share;
    share
}

#[must_use]
pub fn decay_finished(item: &DecayItem) -> bool {
    item.timer >= item.decay_period || item.nutrients_remaining <= 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecosphere_data::{
        Chromosome, Classification, EntityId, Identity, Metabolism, Position, SpeciesId,
        TraitVector, Velocity,
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn adult(id: u64, species: u32) -> Entity {
        Entity {
            identity: Identity {
                id: EntityId(id),
                species: SpeciesId(species),
                generation: 0,
                parent_a: None,
                parent_b: None,
            },
            position: Position::new(5.0, 5.0),
            velocity: Velocity::default(),
            metabolism: Metabolism {
                energy: 150.0,
                energy_cap: 200.0,
                age: 100,
                max_age: 1000,
                alive: true,
                died_tick: None,
                offspring: 0,
            },
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
    fn eligibility_gates() {
        let config = ReproductionConfig::default();
        let mut e = adult(1, 0);
        assert!(eligible(&e, &config, Season::Summer));

        e.metabolism.age = 10;
        assert!(!eligible(&e, &config, Season::Summer), "immature");
        e.metabolism.age = 100;

        e.metabolism.energy = 10.0;
        assert!(!eligible(&e, &config, Season::Summer), "starving");
        e.metabolism.energy = 150.0;

        e.reproduction = ReproStatus::Cooldown { until_tick: 500 };
        assert!(!eligible(&e, &config, Season::Summer), "cooling down");
    }

    #[test]
    fn winter_raises_the_energy_floor() {
        let config = ReproductionConfig::default();
        let e = adult(1, 0);
        let summer = mating_energy_floor(&e, &config, Season::Summer);
        let winter = mating_energy_floor(&e, &config, Season::Winter);
        assert!(winter > summer);
    }

    #[test]
    fn same_species_always_compatible() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = ReproductionConfig::default();
        let a = adult(1, 0);
        let b = adult(2, 0);
        assert!(compatible(&a, &b, &config, &mut rng));
    }

    #[test]
    fn cross_species_is_rare_and_similarity_scaled() {
        let config = ReproductionConfig::default();
        let a = adult(1, 0);
        let mut b = adult(2, 7);
        b.traits.set(TraitId::Size, 1.9);
        b.traits.set(TraitId::Speed, -1.9);

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let allowed = (0..1000)
            .filter(|_| compatible(&a, &b, &config, &mut rng))
            .count();
        // Distant genetics: below the 5% base rate.
        assert!(allowed < 40);
    }

    #[test]
    fn decay_conserves_nutrients_into_soil() {
        let config = ReproductionConfig::default();
        let entity = adult(1, 0);
        let mut item = corpse_decay_item(&entity, &config);
        let total = item.nutrients_remaining;
        let mut cell = crate::grid::WorldGrid::generate(8, 8, 4.0, 1).cells[0].clone();
        let soil_before = cell.soil.total();

        let mut released = 0.0;
        for _ in 0..config.decay_period {
            released += decay_step(&mut item, &mut cell, false);
            if decay_finished(&item) {
                break;
            }
        }
        assert!(decay_finished(&item));
        assert!((released - total).abs() < 1e-3);
        assert!((cell.soil.total() - soil_before - released).abs() < 1e-3);
    }

    #[test]
    fn fungal_decomposers_accelerate_decay() {
        let config = ReproductionConfig::default();
        let entity = adult(1, 0);
        let mut plain = corpse_decay_item(&entity, &config);
        let mut fungal = corpse_decay_item(&entity, &config);
        let mut cell = crate::grid::WorldGrid::generate(8, 8, 4.0, 1).cells[0].clone();

        for _ in 0..10 {
            decay_step(&mut plain, &mut cell, false);
            decay_step(&mut fungal, &mut cell, true);
        }
        assert!(fungal.nutrients_remaining < plain.nutrients_remaining);
    }

    #[test]
    fn brood_size_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            let b = brood_size(&mut rng);
            assert!((1..=3).contains(&b));
        }
    }
}
