//! Species assignment by trait distance and the phylogenetic lineage forest.
//!
//! Entities and plants cluster in separate namespaces (realms) but share the
//! registry and id space. Reassignment runs every `speciation.interval`
//! ticks and converges internally, so an immediate second pass over
//! unchanged state reproduces the same membership.

use crate::config::SpeciationConfig;
use ecosphere_data::{SpeciesId, TraitVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Realm {
    Fauna,
    Flora,
}

/// One node of the lineage forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub id: SpeciesId,
    pub realm: Realm,
    pub name: String,
    pub parent: Option<SpeciesId>,
    pub formed_tick: u64,
    pub centroid: TraitVector,
    pub member_count: usize,
    pub peak_population: usize,
    /// Tick at which the population last hit zero, if it is currently empty.
    pub empty_since: Option<u64>,
    pub extinct_tick: Option<u64>,
}

impl SpeciesRecord {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.extinct_tick.is_none()
    }
}

/// A member view handed to reassignment: expressed traits plus the mutable
/// species tag on the owning record.
pub struct Member<'a> {
    pub traits: &'a TraitVector,
    pub species: &'a mut SpeciesId,
}

/// Outcome of one reassignment pass.
#[derive(Debug, Clone, Default)]
pub struct ReassignOutcome {
    /// Newly founded species: (id, parent, member count).
    pub founded: Vec<(SpeciesId, Option<SpeciesId>, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpeciesRegistry {
    pub records: Vec<SpeciesRecord>,
}

impl SpeciesRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a founding species around a known centroid.
    pub fn found(
        &mut self,
        realm: Realm,
        name: impl Into<String>,
        centroid: TraitVector,
        parent: Option<SpeciesId>,
        tick: u64,
    ) -> SpeciesId {
        let id = SpeciesId(self.records.len() as u32);
        self.records.push(SpeciesRecord {
            id,
            realm,
            name: name.into(),
            parent,
            formed_tick: tick,
            centroid,
            member_count: 0,
            peak_population: 0,
            empty_since: None,
            extinct_tick: None,
        });
        id
    }

    #[must_use]
    pub fn get(&self, id: SpeciesId) -> Option<&SpeciesRecord> {
        self.records.get(id.0 as usize)
    }

    #[must_use]
    pub fn name_of(&self, id: SpeciesId) -> &str {
        self.get(id).map_or("unknown", |r| r.name.as_str())
    }

    #[must_use]
    pub fn active_count(&self, realm: Realm) -> usize {
        self.records
            .iter()
            .filter(|r| r.realm == realm && r.is_active() && r.member_count > 0)
            .count()
    }

    /// Depth of a species in the lineage forest (roots have depth 1).
    #[must_use]
    pub fn lineage_depth(&self, id: SpeciesId) -> usize {
        let mut depth = 1;
        let mut current = self.get(id).and_then(|r| r.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).and_then(|r| r.parent);
            if depth > self.records.len() {
                break;
            }
        }
        depth
    }

    /// Refresh per-tick population counts; returns species that crossed the
    /// extinction threshold this tick.
    pub fn update_counts(
        &mut self,
        counts: &HashMap<SpeciesId, usize>,
        extinction_ticks: u64,
        tick: u64,
    ) -> Vec<SpeciesId> {
        let mut extinct = Vec::new();
        for record in &mut self.records {
            if !record.is_active() {
                continue;
            }
            let count = counts.get(&record.id).copied().unwrap_or(0);
            record.member_count = count;
            record.peak_population = record.peak_population.max(count);
            if count == 0 {
                let since = *record.empty_since.get_or_insert(tick);
                if tick.saturating_sub(since) >= extinction_ticks {
                    record.extinct_tick = Some(tick);
                    extinct.push(record.id);
                }
            } else {
                record.empty_since = None;
            }
        }
        extinct
    }

    /// Reassign every member of one realm.
    ///
    /// 1. Assign to the nearest active centroid under `assign_threshold`.
    /// 2. Greedily cluster the unassigned; clusters of at least
    ///    `min_species_size` found a new species, with the nearest existing
    ///    species as parent when within `parent_threshold`.
    /// 3. Recompute centroids and iterate until membership is stable, so a
    ///    repeated call over unchanged state is a fixed point.
    pub fn reassign(
        &mut self,
        realm: Realm,
        members: &mut [Member<'_>],
        config: &SpeciationConfig,
        tick: u64,
    ) -> ReassignOutcome {
        let mut outcome = ReassignOutcome::default();
        if members.is_empty() {
            return outcome;
        }

        for _round in 0..8 {
            let active: Vec<(SpeciesId, TraitVector)> = self
                .records
                .iter()
                .filter(|r| r.realm == realm && r.is_active())
                .map(|r| (r.id, r.centroid))
                .collect();

            // Pass 1: nearest-centroid assignment.
            let mut unassigned: Vec<usize> = Vec::new();
            let mut changed = false;
            for (idx, member) in members.iter_mut().enumerate() {
                let mut best: Option<(SpeciesId, f32)> = None;
                for (sid, centroid) in &active {
                    let d = member.traits.distance(centroid);
                    if best.map_or(true, |(_, bd)| d < bd) {
                        best = Some((*sid, d));
                    }
                }
                match best {
                    Some((sid, d)) if d < config.assign_threshold => {
                        if *member.species != sid {
                            *member.species = sid;
                            changed = true;
                        }
                    }
                    _ => unassigned.push(idx),
                }
            }

            // Pass 2: greedy clustering of the unassigned, in slice order for
            // determinism.
            let mut remaining = unassigned;
            while let Some(&seed_idx) = remaining.first() {
                let seed_traits = *members[seed_idx].traits;
                let (cluster, rest): (Vec<usize>, Vec<usize>) = remaining
                    .iter()
                    .copied()
                    .partition(|&i| members[i].traits.distance(&seed_traits) < config.assign_threshold);
                remaining = rest;

                if cluster.len() >= config.min_species_size {
                    let centroid = mean_traits(members, &cluster);
                    let parent = self
                        .records
                        .iter()
                        .filter(|r| r.realm == realm && r.is_active())
                        .map(|r| (r.id, r.centroid.distance(&centroid)))
                        .min_by(|a, b| a.1.total_cmp(&b.1))
                        .filter(|(_, d)| *d < config.parent_threshold)
                        .map(|(id, _)| id);

                    let name = format!("{}-{}", realm_prefix(realm), self.records.len());
                    let new_id = self.found(realm, name, centroid, parent, tick);
                    for &i in &cluster {
                        *members[i].species = new_id;
                    }
                    outcome.founded.push((new_id, parent, cluster.len()));
                    changed = true;
                }
                // Clusters below the size floor keep their previous tag.
            }

            // Pass 3: recompute centroids from actual membership.
            let mut sums: HashMap<SpeciesId, (TraitVector, usize)> = HashMap::new();
            for member in members.iter() {
                let entry = sums
                    .entry(*member.species)
                    .or_insert((TraitVector::default(), 0));
                for i in 0..entry.0 .0.len() {
                    entry.0 .0[i] += member.traits.0[i];
                }
                entry.1 += 1;
            }
            for record in &mut self.records {
                if record.realm != realm || !record.is_active() {
                    continue;
                }
                if let Some((sum, count)) = sums.get(&record.id) {
                    if *count > 0 {
                        let mut centroid = *sum;
                        for v in &mut centroid.0 {
                            *v /= *count as f32;
                        }
                        record.centroid = centroid;
                    }
                }
            }

            if !changed {
                break;
            }
        }

        outcome
    }
}

fn mean_traits(members: &[Member<'_>], indices: &[usize]) -> TraitVector {
    let mut sum = TraitVector::default();
    for &i in indices {
        for (slot, v) in sum.0.iter_mut().zip(members[i].traits.0.iter()) {
            *slot += v;
        }
    }
    for v in &mut sum.0 {
        *v /= indices.len().max(1) as f32;
    }
    sum
}

fn realm_prefix(realm: Realm) -> &'static str {
    match realm {
        Realm::Fauna => "fauna",
        Realm::Flora => "flora",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecosphere_data::TraitId;

    fn traits_at(value: f32) -> TraitVector {
        let mut t = TraitVector::default();
        t.set(TraitId::Speed, value);
        t.set(TraitId::Size, value);
        t
    }

    fn run_reassign(
        registry: &mut SpeciesRegistry,
        traits: &[TraitVector],
        tags: &mut [SpeciesId],
        config: &SpeciationConfig,
        tick: u64,
    ) -> ReassignOutcome {
        let mut members: Vec<Member<'_>> = traits
            .iter()
            .zip(tags.iter_mut())
            .map(|(t, s)| Member {
                traits: t,
                species: s,
            })
            .collect();
        registry.reassign(Realm::Fauna, &mut members, config, tick)
    }

    #[test]
    fn distant_cluster_founds_new_species() {
        let mut registry = SpeciesRegistry::new();
        let root = registry.found(Realm::Fauna, "fauna-0", traits_at(0.0), None, 0);
        let config = SpeciationConfig::default();

        let traits: Vec<TraitVector> = (0..6)
            .map(|i| if i < 3 { traits_at(0.0) } else { traits_at(1.8) })
            .collect();
        let mut tags = vec![root; 6];

        let outcome = run_reassign(&mut registry, &traits, &mut tags, &config, 10);
        assert_eq!(outcome.founded.len(), 1);
        let new_id = outcome.founded[0].0;
        assert_ne!(new_id, root);
        assert_eq!(&tags[3..], &[new_id; 3]);
        assert_eq!(&tags[..3], &[root; 3]);
    }

    #[test]
    fn reassignment_is_idempotent() {
        let mut registry = SpeciesRegistry::new();
        let root = registry.found(Realm::Fauna, "fauna-0", traits_at(0.0), None, 0);
        let config = SpeciationConfig::default();

        let traits: Vec<TraitVector> = (0..8)
            .map(|i| traits_at(if i % 2 == 0 { 0.1 } else { 1.7 }))
            .collect();
        let mut tags = vec![root; 8];

        run_reassign(&mut registry, &traits, &mut tags, &config, 10);
        let first = tags.clone();
        run_reassign(&mut registry, &traits, &mut tags, &config, 20);
        assert_eq!(tags, first);
    }

    #[test]
    fn tiny_clusters_keep_their_tag() {
        let mut registry = SpeciesRegistry::new();
        let root = registry.found(Realm::Fauna, "fauna-0", traits_at(0.0), None, 0);
        let config = SpeciationConfig::default();

        // Two outliers: below min_species_size, no new species.
        let traits = vec![traits_at(0.0), traits_at(0.0), traits_at(0.0), traits_at(1.9), traits_at(1.9)];
        let mut tags = vec![root; 5];
        let outcome = run_reassign(&mut registry, &traits, &mut tags, &config, 10);
        assert!(outcome.founded.is_empty());
        assert_eq!(tags, vec![root; 5]);
    }

    #[test]
    fn extinction_fires_after_threshold() {
        let mut registry = SpeciesRegistry::new();
        let id = registry.found(Realm::Fauna, "fauna-0", traits_at(0.0), None, 0);
        let counts = HashMap::new();

        assert!(registry.update_counts(&counts, 100, 10).is_empty());
        let extinct = registry.update_counts(&counts, 100, 110);
        assert_eq!(extinct, vec![id]);
        assert!(!registry.get(id).unwrap().is_active());
        // Already-extinct species are not re-reported.
        assert!(registry.update_counts(&counts, 100, 120).is_empty());
    }

    #[test]
    fn lineage_depth_counts_ancestry() {
        let mut registry = SpeciesRegistry::new();
        let a = registry.found(Realm::Fauna, "a", traits_at(0.0), None, 0);
        let b = registry.found(Realm::Fauna, "b", traits_at(0.5), Some(a), 10);
        let c = registry.found(Realm::Fauna, "c", traits_at(1.0), Some(b), 20);
        assert_eq!(registry.lineage_depth(a), 1);
        assert_eq!(registry.lineage_depth(c), 3);
    }
}
