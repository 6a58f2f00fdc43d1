//! Inter-colony diplomacy and warfare: pairwise relations with trust and
//! reputation, border-driven escalation, stochastic battle resolution, and
//! alliance trade.

use ecosphere_data::{ColonyId, ConflictKind, Diplomacy, Relation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Symmetric pairwise diplomacy, keyed by the normalized colony pair.
/// Serialized as a sorted entry list (JSON maps need string keys).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "Vec<DiplomacyEntry>", into = "Vec<DiplomacyEntry>")]
pub struct DiplomacyTable {
    pub relations: HashMap<(ColonyId, ColonyId), Diplomacy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiplomacyEntry {
    pub a: ColonyId,
    pub b: ColonyId,
    pub diplomacy: Diplomacy,
}

impl From<Vec<DiplomacyEntry>> for DiplomacyTable {
    fn from(entries: Vec<DiplomacyEntry>) -> Self {
        let relations = entries
            .into_iter()
            .map(|e| (key(e.a, e.b), e.diplomacy))
            .collect();
        Self { relations }
    }
}

impl From<DiplomacyTable> for Vec<DiplomacyEntry> {
    fn from(table: DiplomacyTable) -> Self {
        let mut entries: Vec<DiplomacyEntry> = table
            .relations
            .into_iter()
            .map(|((a, b), diplomacy)| DiplomacyEntry { a, b, diplomacy })
            .collect();
        entries.sort_by_key(|e| (e.a, e.b));
        entries
    }
}

#[inline]
fn key(a: ColonyId, b: ColonyId) -> (ColonyId, ColonyId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl DiplomacyTable {
    #[must_use]
    pub fn get(&self, a: ColonyId, b: ColonyId) -> Diplomacy {
        self.relations.get(&key(a, b)).copied().unwrap_or_default()
    }

    pub fn get_mut(&mut self, a: ColonyId, b: ColonyId) -> &mut Diplomacy {
        self.relations.entry(key(a, b)).or_default()
    }

    pub fn remove_colony(&mut self, colony: ColonyId) {
        self.relations.retain(|(a, b), _| *a != colony && *b != colony);
    }

    /// Drift relations from border pressure: shared borders erode trust and
    /// escalate; separation lets trust recover. High-trust neutral pairs
    /// warm toward friendship and alliance.
    pub fn apply_border_pressure(
        &mut self,
        a: ColonyId,
        b: ColonyId,
        overlap_cells: usize,
        threshold: usize,
    ) {
        let diplomacy = self.get_mut(a, b);
        if overlap_cells >= threshold {
            diplomacy.trust = (diplomacy.trust - 0.05).max(0.0);
            diplomacy.relation = match diplomacy.relation {
                Relation::Allied => Relation::Friendly,
                Relation::Friendly => Relation::Neutral,
                Relation::Neutral => Relation::Rival,
                Relation::Rival => Relation::Hostile,
                Relation::Hostile | Relation::Enemy => Relation::Enemy,
            };
        } else {
            diplomacy.trust = (diplomacy.trust + 0.01).min(1.0);
            if diplomacy.trust > 0.7 {
                diplomacy.relation = match diplomacy.relation {
                    Relation::Enemy => Relation::Hostile,
                    Relation::Hostile => Relation::Rival,
                    Relation::Rival => Relation::Neutral,
                    Relation::Neutral => Relation::Friendly,
                    Relation::Friendly | Relation::Allied => Relation::Allied,
                };
            }
        }
    }

    /// Colonies allied for trade purposes.
    #[must_use]
    pub fn allied(&self, a: ColonyId, b: ColonyId) -> bool {
        self.get(a, b).relation == Relation::Allied
    }
}

/// Whether a hostile pair declares open conflict this evaluation, and what
/// kind. Raid for opportunistic low-trust pairs, skirmish as the default
/// opener, resource war under depleted stockpiles, total war for enemies.
#[must_use]
pub fn maybe_declare<R: Rng>(
    diplomacy: &Diplomacy,
    attacker_stockpile_low: bool,
    rng: &mut R,
) -> Option<ConflictKind> {
    let chance = match diplomacy.relation {
        Relation::Enemy => 0.2,
        Relation::Hostile => 0.08,
        _ => return None,
    };
    if !rng.gen_bool(chance) {
        return None;
    }
    Some(if diplomacy.relation == Relation::Enemy {
        ConflictKind::TotalWar
    } else if attacker_stockpile_low {
        ConflictKind::ResourceWar
    } else if diplomacy.trust < 0.2 {
        ConflictKind::Raid
    } else {
        ConflictKind::Skirmish
    })
}

/// Outcome of one battle round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BattleOutcome {
    pub attacker_wins: bool,
    /// Soldier casualties on each side.
    pub attacker_losses: u32,
    pub defender_losses: u32,
    /// Decisive outcomes transfer territory.
    pub decisive: bool,
}

/// Resolve a battle stochastically from aggregate soldier strengths. The
/// defender enjoys a territorial modifier; losses scale with the conflict
/// kind's intensity and fall mostly on the losing side.
#[must_use]
pub fn resolve_battle<R: Rng>(
    kind: ConflictKind,
    attacker_strength: f64,
    defender_strength: f64,
    defender_territory_bonus: f64,
    attacker_soldiers: u32,
    defender_soldiers: u32,
    rng: &mut R,
) -> BattleOutcome {
    let intensity = match kind {
        ConflictKind::Skirmish => 0.15,
        ConflictKind::Raid => 0.25,
        ConflictKind::ResourceWar => 0.4,
        ConflictKind::TotalWar => 0.7,
    };

    let attack = attacker_strength.max(0.1) * rng.gen_range(0.7..1.3);
    let defense = (defender_strength.max(0.1) + defender_territory_bonus) * rng.gen_range(0.7..1.3);
    let attacker_wins = attack > defense;

    let ratio = (attack / (attack + defense)).clamp(0.1, 0.9);
    let attacker_loss_rate = intensity * (1.0 - ratio) * 1.5;
    let defender_loss_rate = intensity * ratio * 1.5;

    let attacker_losses =
        ((f64::from(attacker_soldiers) * attacker_loss_rate).round() as u32).min(attacker_soldiers);
    let defender_losses =
        ((f64::from(defender_soldiers) * defender_loss_rate).round() as u32).min(defender_soldiers);

    let margin = (attack - defense).abs() / (attack + defense);
    BattleOutcome {
        attacker_wins,
        attacker_losses,
        defender_losses,
        decisive: margin > 0.25 && matches!(kind, ConflictKind::TotalWar | ConflictKind::ResourceWar),
    }
}

/// Trade volume between allied colonies: the surplus flows scaled by trust
/// and attenuated by distance.
#[must_use]
pub fn trade_amount(
    surplus: f64,
    trust: f32,
    nest_distance: f64,
    trade_efficiency: f64,
) -> f64 {
    if surplus <= 0.0 {
        return 0.0;
    }
    let distance_factor = 1.0 / (1.0 + nest_distance / 20.0);
    surplus * 0.25 * f64::from(trust) * distance_factor * trade_efficiency
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn relations_are_symmetric_by_key() {
        let mut table = DiplomacyTable::default();
        table.get_mut(ColonyId(2), ColonyId(1)).trust = 0.9;
        assert!((table.get(ColonyId(1), ColonyId(2)).trust - 0.9).abs() < 1e-6);
    }

    #[test]
    fn border_overlap_escalates() {
        let mut table = DiplomacyTable::default();
        let a = ColonyId(1);
        let b = ColonyId(2);
        for _ in 0..5 {
            table.apply_border_pressure(a, b, 10, 3);
        }
        let d = table.get(a, b);
        assert_eq!(d.relation, Relation::Enemy);
        assert!(d.trust < 0.5);
    }

    #[test]
    fn separation_heals_relations() {
        let mut table = DiplomacyTable::default();
        let a = ColonyId(1);
        let b = ColonyId(2);
        table.get_mut(a, b).relation = Relation::Hostile;
        table.get_mut(a, b).trust = 0.0;
        for _ in 0..200 {
            table.apply_border_pressure(a, b, 0, 3);
        }
        let d = table.get(a, b);
        assert_eq!(d.relation, Relation::Allied);
        assert!((d.trust - 1.0).abs() < 1e-6);
    }

    #[test]
    fn only_hostile_pairs_declare() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let peaceful = Diplomacy {
            relation: Relation::Friendly,
            trust: 0.8,
            reputation: 0.5,
        };
        for _ in 0..100 {
            assert!(maybe_declare(&peaceful, false, &mut rng).is_none());
        }

        let enemy = Diplomacy {
            relation: Relation::Enemy,
            trust: 0.0,
            reputation: 0.0,
        };
        let declared = (0..200)
            .filter_map(|_| maybe_declare(&enemy, false, &mut rng))
            .count();
        assert!(declared > 0);
    }

    #[test]
    fn stronger_side_usually_wins() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut attacker_wins = 0;
        for _ in 0..200 {
            let outcome = resolve_battle(ConflictKind::Skirmish, 100.0, 10.0, 5.0, 20, 20, &mut rng);
            if outcome.attacker_wins {
                attacker_wins += 1;
            }
        }
        assert!(attacker_wins > 150);
    }

    #[test]
    fn losses_never_exceed_soldiers() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            let outcome =
                resolve_battle(ConflictKind::TotalWar, 50.0, 50.0, 0.0, 3, 2, &mut rng);
            assert!(outcome.attacker_losses <= 3);
            assert!(outcome.defender_losses <= 2);
        }
    }

    #[test]
    fn trade_scales_with_trust_and_distance() {
        let near_trusted = trade_amount(100.0, 1.0, 5.0, 0.8);
        let far_trusted = trade_amount(100.0, 1.0, 100.0, 0.8);
        let near_wary = trade_amount(100.0, 0.2, 5.0, 0.8);
        assert!(near_trusted > far_trusted);
        assert!(near_trusted > near_wary);
        assert_eq!(trade_amount(0.0, 1.0, 5.0, 0.8), 0.0);
    }
}
