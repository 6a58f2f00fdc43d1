//! Lagrangian pollen and seed transport: release, wind-coupled integration,
//! deposition onto compatible plants, per-cell seed banks, and germination.

use crate::config::WindConfig;
use crate::flora::profile;
use crate::grid::Cell;
use ecosphere_data::{
    BankedSeed, Grain, GrainId, GrainKind, Plant, SeedMechanism, Velocity,
};
use rand::Rng;

/// Radius within which a pollen grain deposits onto a compatible plant.
pub const DEPOSIT_RADIUS: f64 = 2.0;

/// Release a pollen grain from a reproducing plant.
#[must_use]
pub fn release_pollen<R: Rng>(plant: &Plant, id: GrainId, tick: u64, rng: &mut R) -> Grain {
    let angle = rng.gen_range(0.0..std::f64::consts::TAU);
    let speed = rng.gen_range(0.05..0.3);
    let prof = profile(plant.kind);
    Grain {
        id,
        kind: GrainKind::Pollen,
        source_plant: plant.id,
        source_type: plant.kind,
        species: plant.species,
        genetics: plant.dna.clone(),
        position: plant.position,
        velocity: Velocity {
            vx: angle.cos() * speed,
            vy: angle.sin() * speed,
        },
        viability: 1.0,
        dormant: false,
        needs: prof.germination,
        released_tick: tick,
    }
}

/// Release a seed grain; the mechanism comes from the type profile and
/// shapes the initial velocity.
#[must_use]
pub fn release_seed<R: Rng>(plant: &Plant, id: GrainId, tick: u64, rng: &mut R) -> Grain {
    let prof = profile(plant.kind);
    let mechanism = prof.mechanism;
    let angle = rng.gen_range(0.0..std::f64::consts::TAU);
    let speed = match mechanism {
        SeedMechanism::Explosive => rng.gen_range(1.0..2.5),
        SeedMechanism::Gravity => rng.gen_range(0.0..0.1),
        SeedMechanism::Animal => 0.0,
        SeedMechanism::Wind | SeedMechanism::Water => rng.gen_range(0.05..0.2),
    };
    Grain {
        id,
        kind: GrainKind::Seed(mechanism),
        source_plant: plant.id,
        source_type: plant.kind,
        species: plant.species,
        genetics: plant.dna.clone(),
        position: plant.position,
        velocity: Velocity {
            vx: angle.cos() * speed,
            vy: angle.sin() * speed,
        },
        viability: 1.0,
        dormant: false,
        needs: prof.germination,
        released_tick: tick,
    }
}

/// How strongly the wind couples to a grain, per transport mode.
#[must_use]
fn wind_coupling(grain: &Grain, aquatic_cell: bool) -> f64 {
    match grain.kind {
        GrainKind::Pollen => 1.0,
        GrainKind::Seed(SeedMechanism::Wind) => 0.9,
        GrainKind::Seed(SeedMechanism::Water) => {
            if aquatic_cell {
                0.7
            } else {
                0.0
            }
        }
        GrainKind::Seed(SeedMechanism::Explosive) => 0.2,
        GrainKind::Seed(SeedMechanism::Animal) => 0.1,
        GrainKind::Seed(SeedMechanism::Gravity) => 0.05,
    }
}

/// One transport step: integrate position from own velocity plus the wind
/// contribution, decay viability by the source type's rate. Animal-carried
/// seeds hitch a jump when a carrier is nearby.
pub fn transport<R: Rng>(
    grain: &mut Grain,
    wind: (f64, f64),
    aquatic_cell: bool,
    carrier_nearby: bool,
    config: &WindConfig,
    rng: &mut R,
) {
    let coupling = wind_coupling(grain, aquatic_cell);
    let drag = config.drag_factor * coupling;

    if matches!(grain.kind, GrainKind::Seed(SeedMechanism::Animal)) && carrier_nearby {
        // Hitch-hike: a passing entity drags the seed a short hop.
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let hop = rng.gen_range(0.5..1.5);
        grain.velocity.vx = angle.cos() * hop;
        grain.velocity.vy = angle.sin() * hop;
    }

    grain.position.x += grain.velocity.vx + wind.0 * drag;
    grain.position.y += grain.velocity.vy + wind.1 * drag;

    // Own momentum bleeds off; wind becomes the dominant term.
    grain.velocity.vx *= 0.9;
    grain.velocity.vy *= 0.9;

    let decay = profile(grain.source_type).viability_decay;
    grain.viability = (grain.viability - decay).max(0.0);
}

/// Whether a seed grain settles into the local seed bank this tick.
#[must_use]
pub fn should_settle<R: Rng>(grain: &Grain, tick: u64, rng: &mut R) -> bool {
    let GrainKind::Seed(mechanism) = grain.kind else {
        return false;
    };
    let airborne = tick.saturating_sub(grain.released_tick);
    let (min_air, settle_chance) = match mechanism {
        SeedMechanism::Gravity => (2, 0.6),
        SeedMechanism::Explosive => (4, 0.4),
        SeedMechanism::Wind => (15, 0.1),
        SeedMechanism::Water => (25, 0.05),
        SeedMechanism::Animal => (10, 0.08),
    };
    airborne >= min_air && rng.gen_bool(settle_chance)
}

/// Deposit a settled seed into a cell's bank, honoring the capacity cap.
/// Returns false when the bank was full and the seed was discarded.
pub fn bank_seed(cell: &mut Cell, grain: &Grain, capacity: usize, tick: u64) -> bool {
    if cell.seed_bank.len() >= capacity {
        return false;
    }
    cell.seed_bank.push(BankedSeed {
        source_type: grain.source_type,
        species: grain.species,
        genetics: grain.genetics.clone(),
        viability: grain.viability,
        needs: grain.needs,
        banked_tick: tick,
    });
    true
}

/// Germination check for one banked seed against current cell conditions.
#[must_use]
pub fn can_germinate(seed: &BankedSeed, cell: &Cell, light: f32) -> bool {
    seed.viability > 0.0
        && cell.temperature >= seed.needs.min_temperature
        && cell.temperature <= seed.needs.max_temperature
        && cell.water >= seed.needs.min_moisture
        && light >= seed.needs.min_light
}

/// Whether a pollen grain fertilizes the given plant: compatible means the
/// same species, and close enough to the stigma.
#[must_use]
pub fn pollinates(grain: &Grain, plant: &Plant) -> bool {
    matches!(grain.kind, GrainKind::Pollen)
        && plant.alive
        && plant.species == grain.species
        && plant.id != grain.source_plant
        && plant.position.distance_to(&grain.position) <= DEPOSIT_RADIUS
}
