//! The mycorrhizal plant network: an undirected graph of typed links
//! carrying resources and chemical signals between living plants.
//!
//! Links are symmetric by construction (one undirected edge). Resource
//! sharing moves energy from donors above the configured fraction of their
//! cap to linked recipients below theirs, bounded by link strength and
//! capped so no donor drops below the donor fraction.

use crate::config::FloraConfig;
use crate::flora::link_compatible;
use ecosphere_data::{ChemicalSignal, ChemicalSignalKind, LinkKind, LinkState, PlantId, PlantType};
use petgraph::graphmap::UnGraphMap;
use std::collections::HashMap;

/// Minimal view of a plant needed by network updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantView {
    pub id: PlantId,
    pub kind: PlantType,
    pub energy: f64,
    pub energy_cap: f64,
    pub alive: bool,
}

/// A planned energy transfer produced by the sharing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    pub from: PlantId,
    pub to: PlantId,
    pub amount: f64,
}

#[derive(Debug, Default)]
pub struct PlantNetwork {
    graph: UnGraphMap<PlantId, LinkState>,
    /// Chemical signals waiting at each plant for this tick's hop.
    inbox: HashMap<PlantId, Vec<ChemicalSignal>>,
}

impl PlantNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plant(&mut self, id: PlantId) {
        self.graph.add_node(id);
    }

    pub fn remove_plant(&mut self, id: PlantId) {
        self.graph.remove_node(id);
        self.inbox.remove(&id);
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn degree(&self, id: PlantId) -> usize {
        self.graph.edges(id).count()
    }

    #[must_use]
    pub fn has_link(&self, a: PlantId, b: PlantId) -> bool {
        self.graph.contains_edge(a, b)
    }

    /// Sorted edge list for snapshots and invariant checks.
    #[must_use]
    pub fn links(&self) -> Vec<(PlantId, PlantId, LinkState)> {
        let mut out: Vec<(PlantId, PlantId, LinkState)> = self
            .graph
            .all_edges()
            .map(|(a, b, state)| if a <= b { (a, b, *state) } else { (b, a, *state) })
            .collect();
        out.sort_by_key(|(a, b, _)| (*a, *b));
        out
    }

    /// Rebuild from a snapshot edge list plus the in-flight signal inboxes.
    pub fn restore(
        links: Vec<(PlantId, PlantId, LinkState)>,
        plants: &[PlantId],
        inbox: Vec<(PlantId, Vec<ChemicalSignal>)>,
    ) -> Self {
        let mut network = Self::new();
        for &id in plants {
            network.add_plant(id);
        }
        for (a, b, state) in links {
            network.graph.add_edge(a, b, state);
        }
        network.inbox = inbox.into_iter().collect();
        network
    }

    /// Sorted copy of the in-flight signal inboxes, for snapshots.
    #[must_use]
    pub fn inbox_snapshot(&self) -> Vec<(PlantId, Vec<ChemicalSignal>)> {
        let mut out: Vec<(PlantId, Vec<ChemicalSignal>)> = self
            .inbox
            .iter()
            .filter(|(_, signals)| !signals.is_empty())
            .map(|(id, signals)| (*id, signals.clone()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Attempt link formation for every plant, in id order.
    ///
    /// Each plant links with up to `max_links` type-compatible neighbors
    /// within `link_radius`; `nearby` supplies candidate ids already sorted
    /// by id. Returns the number of links formed.
    pub fn form_links<F>(
        &mut self,
        plants: &[PlantView],
        nearby: F,
        config: &FloraConfig,
        tick: u64,
    ) -> usize
    where
        F: Fn(PlantId) -> Vec<PlantId>,
    {
        let by_id: HashMap<PlantId, &PlantView> = plants.iter().map(|p| (p.id, p)).collect();
        let mut formed = 0;
        for plant in plants {
            if !plant.alive {
                continue;
            }
            if self.degree(plant.id) >= config.max_links {
                continue;
            }
            for candidate in nearby(plant.id) {
                if candidate == plant.id || self.has_link(plant.id, candidate) {
                    continue;
                }
                let Some(other) = by_id.get(&candidate) else {
                    continue;
                };
                if !other.alive
                    || !link_compatible(plant.kind, other.kind)
                    || self.degree(candidate) >= config.max_links
                {
                    continue;
                }
                let kind = if plant.kind.is_fungal() || other.kind.is_fungal() {
                    LinkKind::Mycorrhizal
                } else if plant.kind == other.kind {
                    LinkKind::Root
                } else {
                    LinkKind::Chemical
                };
                self.graph.add_edge(
                    plant.id,
                    candidate,
                    LinkState {
                        kind,
                        strength: config.link_initial_strength,
                        health: 1.0,
                        formed_tick: tick,
                    },
                );
                formed += 1;
                if self.degree(plant.id) >= config.max_links {
                    break;
                }
            }
        }
        formed
    }

    /// Per-tick link maintenance: strength grows when both endpoints are
    /// energy-comfortable, decays otherwise; links to dead plants or with
    /// exhausted health are removed.
    pub fn update_links(&mut self, plants: &[PlantView]) {
        let by_id: HashMap<PlantId, &PlantView> = plants.iter().map(|p| (p.id, p)).collect();
        let mut dead_edges: Vec<(PlantId, PlantId)> = Vec::new();

        let edges: Vec<(PlantId, PlantId)> = self.links().iter().map(|(a, b, _)| (*a, *b)).collect();
        for (a, b) in edges {
            let healthy = match (by_id.get(&a), by_id.get(&b)) {
                (Some(pa), Some(pb)) if pa.alive && pb.alive => {
                    let ra = pa.energy / pa.energy_cap.max(1e-9);
                    let rb = pb.energy / pb.energy_cap.max(1e-9);
                    ra > 0.25 && rb > 0.25
                }
                _ => {
                    dead_edges.push((a, b));
                    continue;
                }
            };

            if let Some(state) = self.graph.edge_weight_mut(a, b) {
                if healthy {
                    state.strength = (state.strength + 0.01).min(1.0);
                    state.health = (state.health + 0.005).min(1.0);
                } else {
                    state.strength *= 0.97;
                    state.health -= 0.01;
                }
                if state.health <= 0.0 || state.strength < 0.01 {
                    dead_edges.push((a, b));
                }
            }
        }

        for (a, b) in dead_edges {
            self.graph.remove_edge(a, b);
        }
    }

    /// Resource-sharing pass. Donors hold energy above `donor_fraction` of
    /// their cap; recipients sit below `recipient_fraction`. Transfers are
    /// bounded by link strength and the donor floor, and are planned against
    /// running balances so a donor never overdraws across several links.
    #[must_use]
    pub fn share_resources(&self, plants: &[PlantView], config: &FloraConfig) -> Vec<Transfer> {
        let mut balance: HashMap<PlantId, (f64, f64)> = plants
            .iter()
            .filter(|p| p.alive)
            .map(|p| (p.id, (p.energy, p.energy_cap)))
            .collect();

        let mut transfers = Vec::new();
        for (a, b, state) in self.links() {
            let Some(&(ea, cap_a)) = balance.get(&a) else { continue };
            let Some(&(eb, cap_b)) = balance.get(&b) else { continue };

            let floor_a = cap_a * f64::from(config.donor_fraction);
            let floor_b = cap_b * f64::from(config.donor_fraction);
            let need_a = cap_a * f64::from(config.recipient_fraction);
            let need_b = cap_b * f64::from(config.recipient_fraction);

            let (from, to, surplus, deficit) = if ea > floor_a && eb < need_b {
                (a, b, ea - floor_a, need_b - eb)
            } else if eb > floor_b && ea < need_a {
                (b, a, eb - floor_b, need_a - ea)
            } else {
                continue;
            };

            let cap = f64::from(state.strength) * 2.0;
            let amount = surplus.min(deficit).min(cap);
            if amount <= 1e-9 {
                continue;
            }

            balance.get_mut(&from).expect("donor tracked").0 -= amount;
            balance.get_mut(&to).expect("recipient tracked").0 += amount;
            transfers.push(Transfer { from, to, amount });
        }
        transfers
    }

    /// Queue a chemical signal at its origin plant.
    pub fn emit_signal(&mut self, origin: PlantId, kind: ChemicalSignalKind, tick: u64) {
        self.inbox.entry(origin).or_default().push(ChemicalSignal {
            kind,
            origin,
            strength: 1.0,
            emitted_tick: tick,
        });
    }

    /// Move every queued signal one hop along links with multiplicative
    /// decay; signals below the audibility floor vanish. Returns the new
    /// per-plant inbox contents (what each plant "hears" this tick).
    pub fn propagate_signals(&mut self, config: &FloraConfig) -> HashMap<PlantId, Vec<ChemicalSignal>> {
        let outgoing = std::mem::take(&mut self.inbox);
        let mut next: HashMap<PlantId, Vec<ChemicalSignal>> = HashMap::new();

        let mut sources: Vec<(&PlantId, &Vec<ChemicalSignal>)> = outgoing.iter().collect();
        sources.sort_by_key(|(id, _)| **id);

        for (&plant, signals) in sources {
            let mut neighbors: Vec<PlantId> = self.graph.neighbors(plant).collect();
            neighbors.sort_unstable();
            for signal in signals {
                let forwarded = ChemicalSignal {
                    strength: signal.strength * config.signal_decay,
                    ..*signal
                };
                if forwarded.strength < 0.05 {
                    continue;
                }
                for &neighbor in &neighbors {
                    // Signals never bounce straight back to their origin.
                    if neighbor == forwarded.origin {
                        continue;
                    }
                    next.entry(neighbor).or_default().push(forwarded);
                }
            }
        }

        self.inbox = next.clone();
        next
    }

    /// Network connectivity: edges over the maximum possible among `n` live
    /// plants.
    #[must_use]
    pub fn connectivity(&self, live_plants: usize) -> f64 {
        if live_plants < 2 {
            return 0.0;
        }
        let max_edges = live_plants * (live_plants - 1) / 2;
        self.graph.edge_count() as f64 / max_edges as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: u64, kind: PlantType, energy: f64) -> PlantView {
        PlantView {
            id: PlantId(id),
            kind,
            energy,
            energy_cap: 100.0,
            alive: true,
        }
    }

    fn linked_network(plants: &[PlantView]) -> PlantNetwork {
        let mut network = PlantNetwork::new();
        let all: Vec<PlantId> = plants.iter().map(|p| p.id).collect();
        let nearby = move |id: PlantId| {
            let mut v: Vec<PlantId> = all.iter().copied().filter(|p| *p != id).collect();
            v.sort_unstable();
            v
        };
        for p in plants {
            network.add_plant(p.id);
        }
        network.form_links(plants, nearby, &FloraConfig::default(), 0);
        network
    }

    #[test]
    fn links_are_symmetric_and_capped() {
        let plants: Vec<PlantView> =
            (0..8).map(|i| view(i, PlantType::Grass, 50.0)).collect();
        let network = linked_network(&plants);
        let config = FloraConfig::default();

        for (a, b, _) in network.links() {
            assert!(network.has_link(b, a), "undirected edge must be symmetric");
        }
        for p in &plants {
            assert!(network.degree(p.id) <= config.max_links);
        }
    }

    #[test]
    fn incompatible_types_never_link() {
        let plants = vec![view(1, PlantType::Cactus, 50.0), view(2, PlantType::Kelp, 50.0)];
        let network = linked_network(&plants);
        assert_eq!(network.link_count(), 0);
    }

    #[test]
    fn sharing_respects_donor_floor() {
        let config = FloraConfig::default();
        let plants = vec![
            view(1, PlantType::Grass, 90.0),
            view(2, PlantType::Grass, 10.0),
        ];
        let mut network = PlantNetwork::new();
        network.add_plant(PlantId(1));
        network.add_plant(PlantId(2));
        network.graph.add_edge(
            PlantId(1),
            PlantId(2),
            LinkState {
                kind: LinkKind::Root,
                strength: 1.0,
                health: 1.0,
                formed_tick: 0,
            },
        );

        let transfers = network.share_resources(&plants, &config);
        assert_eq!(transfers.len(), 1);
        let t = transfers[0];
        assert_eq!(t.from, PlantId(1));
        assert_eq!(t.to, PlantId(2));
        // Donor floor: 60% of cap.
        assert!(90.0 - t.amount >= 60.0 - 1e-9);
        assert!(t.amount <= 2.0 + 1e-9);
    }

    #[test]
    fn comfortable_plants_do_not_transfer() {
        let config = FloraConfig::default();
        let plants = vec![
            view(1, PlantType::Grass, 50.0),
            view(2, PlantType::Grass, 50.0),
        ];
        let network = linked_network(&plants);
        assert!(network.share_resources(&plants, &config).is_empty());
    }

    #[test]
    fn dead_endpoint_links_are_removed() {
        let mut plants = vec![
            view(1, PlantType::Grass, 50.0),
            view(2, PlantType::Grass, 50.0),
        ];
        let mut network = linked_network(&plants);
        assert_eq!(network.link_count(), 1);
        plants[1].alive = false;
        network.update_links(&plants);
        assert_eq!(network.link_count(), 0);
    }

    #[test]
    fn signals_hop_once_per_tick_with_decay() {
        let plants = vec![
            view(1, PlantType::Grass, 50.0),
            view(2, PlantType::Grass, 50.0),
            view(3, PlantType::Grass, 50.0),
        ];
        let mut network = PlantNetwork::new();
        for p in &plants {
            network.add_plant(p.id);
        }
        let link = LinkState {
            kind: LinkKind::Root,
            strength: 0.5,
            health: 1.0,
            formed_tick: 0,
        };
        // Chain 1 - 2 - 3.
        network.graph.add_edge(PlantId(1), PlantId(2), link);
        network.graph.add_edge(PlantId(2), PlantId(3), link);

        let config = FloraConfig::default();
        network.emit_signal(PlantId(1), ChemicalSignalKind::Threat, 0);

        let hop1 = network.propagate_signals(&config);
        assert!(hop1.contains_key(&PlantId(2)));
        assert!(!hop1.contains_key(&PlantId(3)));
        let s1 = hop1[&PlantId(2)][0].strength;
        assert!((s1 - config.signal_decay).abs() < 1e-6);

        let hop2 = network.propagate_signals(&config);
        assert!(hop2.contains_key(&PlantId(3)));
        let s2 = hop2[&PlantId(3)][0].strength;
        assert!(s2 < s1);
    }

    #[test]
    fn connectivity_counts_edges_over_max() {
        let plants = vec![
            view(1, PlantType::Grass, 50.0),
            view(2, PlantType::Grass, 50.0),
            view(3, PlantType::Grass, 50.0),
        ];
        let network = linked_network(&plants);
        let c = network.connectivity(3);
        assert!(c > 0.0 && c <= 1.0);
        assert_eq!(network.connectivity(1), 0.0);
    }
}
