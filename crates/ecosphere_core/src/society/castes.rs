//! Caste assignment: colony-level quotas optimized greedily from member
//! traits, plus the per-role trait modifiers and reproductive multipliers.

use crate::config::ColonyConfig;
use ecosphere_data::{CasteRole, EntityId, TraitId, TraitVector};

/// Whether an entity can take part in founding a colony.
#[must_use]
pub fn eligible_founder(traits: &TraitVector, in_colony: bool, config: &ColonyConfig) -> bool {
    !in_colony
        && traits.get(TraitId::Cooperation) >= config.cooperation_threshold
        && traits.get(TraitId::Intelligence) >= config.intelligence_threshold
}

/// Queen election score: intelligence weighted by social leadership
/// (cooperation stands in for a dedicated leadership trait).
#[must_use]
pub fn queen_score(traits: &TraitVector) -> f32 {
    traits.get(TraitId::Intelligence) * (1.0 + traits.get(TraitId::Cooperation))
}

fn soldier_score(traits: &TraitVector) -> f32 {
    traits.get(TraitId::Aggression) + traits.get(TraitId::Defense)
}

fn scout_score(traits: &TraitVector) -> f32 {
    traits.get(TraitId::Speed) + traits.get(TraitId::Curiosity)
}

fn builder_score(traits: &TraitVector) -> f32 {
    traits.get(TraitId::Endurance) + traits.get(TraitId::Digging)
}

/// Assign a caste to every member, honoring colony quotas:
/// one queen (pre-elected, first in `members`), at most `soldier_quota`
/// soldiers and `scout_quota` scouts, one nurse per four workers, a builder
/// pair, a few drones, specialists from the brightest leftovers, workers
/// for the rest. `members` must be sorted by id with the queen first.
#[must_use]
pub fn assign_castes(
    members: &[(EntityId, TraitVector)],
    config: &ColonyConfig,
) -> Vec<(EntityId, CasteRole)> {
    let mut roles: Vec<(EntityId, CasteRole)> = Vec::with_capacity(members.len());
    if members.is_empty() {
        return roles;
    }

    roles.push((members[0].0, CasteRole::Queen));
    let rest = &members[1..];
    let n = rest.len();

    let max_soldiers = (n as f32 * config.soldier_quota).floor() as usize;
    let max_scouts = (n as f32 * config.scout_quota).floor() as usize;

    let mut by_soldier: Vec<usize> = (0..n).collect();
    by_soldier.sort_by(|&a, &b| {
        soldier_score(&rest[b].1)
            .total_cmp(&soldier_score(&rest[a].1))
            .then(rest[a].0.cmp(&rest[b].0))
    });
    let mut assigned = vec![None::<CasteRole>; n];
    for &idx in by_soldier.iter().take(max_soldiers) {
        assigned[idx] = Some(CasteRole::Soldier);
    }

    let mut by_scout: Vec<usize> = (0..n).filter(|&i| assigned[i].is_none()).collect();
    by_scout.sort_by(|&a, &b| {
        scout_score(&rest[b].1)
            .total_cmp(&scout_score(&rest[a].1))
            .then(rest[a].0.cmp(&rest[b].0))
    });
    for &idx in by_scout.iter().take(max_scouts) {
        assigned[idx] = Some(CasteRole::Scout);
    }

    let mut by_builder: Vec<usize> = (0..n).filter(|&i| assigned[i].is_none()).collect();
    by_builder.sort_by(|&a, &b| {
        builder_score(&rest[b].1)
            .total_cmp(&builder_score(&rest[a].1))
            .then(rest[a].0.cmp(&rest[b].0))
    });
    for &idx in by_builder.iter().take(2.min(by_builder.len())) {
        assigned[idx] = Some(CasteRole::Builder);
    }

    // Drones: a couple of high-fertility members keep the colony breeding.
    let mut by_fertility: Vec<usize> = (0..n).filter(|&i| assigned[i].is_none()).collect();
    by_fertility.sort_by(|&a, &b| {
        rest[b].1
            .get(TraitId::Fertility)
            .total_cmp(&rest[a].1.get(TraitId::Fertility))
            .then(rest[a].0.cmp(&rest[b].0))
    });
    for &idx in by_fertility.iter().take(2.min(by_fertility.len())) {
        assigned[idx] = Some(CasteRole::Drone);
    }

    // Remaining members become workers; one nurse per four workers, and the
    // brightest leftover upgrades to specialist.
    let unassigned: Vec<usize> = (0..n).filter(|&i| assigned[i].is_none()).collect();
    let nurse_count = unassigned.len() / 5;
    for (slot, &idx) in unassigned.iter().enumerate() {
        assigned[idx] = Some(if slot < nurse_count {
            CasteRole::Nurse
        } else {
            CasteRole::Worker
        });
    }
    if let Some(&best) = unassigned
        .iter()
        .filter(|&&i| assigned[i] == Some(CasteRole::Worker))
        .max_by(|&&a, &&b| {
            rest[a].1
                .get(TraitId::Intelligence)
                .total_cmp(&rest[b].1.get(TraitId::Intelligence))
        })
    {
        if rest[best].1.get(TraitId::Intelligence) > 0.6 {
            assigned[best] = Some(CasteRole::Specialist);
        }
    }

    for (idx, member) in rest.iter().enumerate() {
        roles.push((member.0, assigned[idx].unwrap_or(CasteRole::Worker)));
    }
    roles
}

/// Trait deltas applied exactly once when a role is assigned; results are
/// clamped to the trait bounds by `TraitVector::adjust`.
#[must_use]
pub fn trait_modifiers(role: CasteRole) -> &'static [(TraitId, f32)] {
    match role {
        CasteRole::Worker => &[(TraitId::Endurance, 0.2), (TraitId::Cooperation, 0.1)],
        CasteRole::Soldier => &[
            (TraitId::Aggression, 0.4),
            (TraitId::Defense, 0.3),
            (TraitId::Fertility, -0.3),
        ],
        CasteRole::Queen => &[(TraitId::Fertility, 0.5), (TraitId::Lifespan, 0.3)],
        CasteRole::Drone => &[(TraitId::Fertility, 0.4), (TraitId::Lifespan, -0.2)],
        CasteRole::Scout => &[
            (TraitId::Speed, 0.3),
            (TraitId::Vision, 0.3),
            (TraitId::Curiosity, 0.2),
        ],
        CasteRole::Nurse => &[(TraitId::Cooperation, 0.3), (TraitId::Aggression, -0.2)],
        CasteRole::Builder => &[(TraitId::Endurance, 0.3), (TraitId::Digging, 0.3)],
        CasteRole::Specialist => &[(TraitId::Intelligence, 0.3), (TraitId::Curiosity, 0.2)],
    }
}

/// Caste reproductive multiplier applied to mating eligibility energy.
#[must_use]
pub fn reproductive_multiplier(role: CasteRole) -> f64 {
    match role {
        CasteRole::Queen => 2.0,
        CasteRole::Drone => 1.5,
        CasteRole::Worker => 0.5,
        CasteRole::Soldier => 0.2,
        CasteRole::Scout => 0.4,
        CasteRole::Nurse => 0.6,
        CasteRole::Builder => 0.5,
        CasteRole::Specialist => 0.8,
    }
}
