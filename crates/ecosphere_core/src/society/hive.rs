//! The hive mind: shared colony memory with confidence decay, weighted
//! group decisions, and purpose-driven formations.

use ecosphere_data::{Formation, HiveMind, MemoryEntry, Position};

/// Below this confidence an entry is forgotten.
const FORGET_THRESHOLD: f32 = 0.05;
/// Entries closer than this merge instead of duplicating.
const MERGE_RADIUS: f64 = 3.0;

fn remember(entries: &mut Vec<MemoryEntry>, position: Position, tick: u64) {
    for entry in entries.iter_mut() {
        if entry.position.distance_to(&position) <= MERGE_RADIUS {
            entry.confidence = (entry.confidence + 0.3).min(1.0);
            entry.recorded_tick = tick;
            return;
        }
    }
    entries.push(MemoryEntry {
        position,
        confidence: 1.0,
        recorded_tick: tick,
    });
}

pub fn remember_food(hive: &mut HiveMind, position: Position, tick: u64) {
    remember(&mut hive.food_sources, position, tick);
}

pub fn remember_threat(hive: &mut HiveMind, position: Position, tick: u64) {
    remember(&mut hive.threats, position, tick);
}

pub fn remember_safe_zone(hive: &mut HiveMind, position: Position, tick: u64) {
    remember(&mut hive.safe_zones, position, tick);
}

/// Per-tick confidence decay across all memory lists; stale entries are
/// dropped.
pub fn decay(hive: &mut HiveMind, rate: f32) {
    for entries in [
        &mut hive.food_sources,
        &mut hive.threats,
        &mut hive.safe_zones,
    ] {
        for entry in entries.iter_mut() {
            entry.confidence *= rate;
        }
        entries.retain(|e| e.confidence >= FORGET_THRESHOLD);
    }
}

/// Strongest remembered food source, if any.
#[must_use]
pub fn best_food(hive: &HiveMind) -> Option<&MemoryEntry> {
    hive.food_sources
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

/// Whether a position sits near a remembered threat.
#[must_use]
pub fn near_threat(hive: &HiveMind, position: &Position, radius: f64) -> bool {
    hive.threats
        .iter()
        .any(|t| t.position.distance_to(position) <= radius)
}

/// Intelligence-weighted vote over formation preferences.
#[must_use]
pub fn group_decision(votes: &[(f32, Formation)]) -> Formation {
    let mut tallies: [(Formation, f32); 4] = [
        (Formation::Foraging, 0.0),
        (Formation::Defensive, 0.0),
        (Formation::Migration, 0.0),
        (Formation::Assault, 0.0),
    ];
    for (weight, formation) in votes {
        for slot in &mut tallies {
            if slot.0 == *formation {
                slot.1 += weight.max(0.0);
            }
        }
    }
    tallies
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(f, _)| *f)
        .unwrap_or(Formation::Foraging)
}

/// Formation preferred by the colony's current situation.
#[must_use]
pub fn formation_for_purpose(
    threatened: bool,
    at_war: bool,
    food_known: bool,
    stockpile_low: bool,
) -> Formation {
    if at_war {
        Formation::Assault
    } else if threatened {
        Formation::Defensive
    } else if stockpile_low && !food_known {
        Formation::Migration
    } else {
        Formation::Foraging
    }
}

/// Coordinated-movement offset for a member within a formation, indexed by
/// the member's rank order in the colony roster.
#[must_use]
pub fn formation_offset(formation: Formation, slot: usize) -> (f64, f64) {
    let i = slot as f64;
    match formation {
        // Loose ring around the nest.
        Formation::Foraging => {
            let angle = i * 2.399_963; // golden angle spreads members evenly
            (angle.cos() * (2.0 + i * 0.5), angle.sin() * (2.0 + i * 0.5))
        }
        // Tight ring, soldiers out front.
        Formation::Defensive => {
            let angle = i * std::f64::consts::TAU / 8.0;
            (angle.cos() * 2.0, angle.sin() * 2.0)
        }
        // Column.
        Formation::Migration => (0.0, i * 1.5),
        // Wedge.
        Formation::Assault => (i * 0.8 * if slot % 2 == 0 { 1.0 } else { -1.0 }, i * 0.6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_memories_merge() {
        let mut hive = HiveMind::default();
        remember_food(&mut hive, Position::new(10.0, 10.0), 0);
        remember_food(&mut hive, Position::new(11.0, 10.0), 5);
        remember_food(&mut hive, Position::new(40.0, 40.0), 5);
        assert_eq!(hive.food_sources.len(), 2);
    }

    #[test]
    fn confidence_decays_to_forgetting() {
        let mut hive = HiveMind::default();
        remember_threat(&mut hive, Position::new(5.0, 5.0), 0);
        for _ in 0..1000 {
            decay(&mut hive, 0.99);
        }
        assert!(hive.threats.is_empty());
    }

    #[test]
    fn weighted_vote_respects_intelligence() {
        let votes = vec![
            (0.9, Formation::Defensive),
            (0.2, Formation::Foraging),
            (0.2, Formation::Foraging),
            (0.2, Formation::Foraging),
        ];
        // Three dull voters outweigh one bright one.
        assert_eq!(group_decision(&votes), Formation::Foraging);

        let votes = vec![
            (2.0, Formation::Defensive),
            (0.2, Formation::Foraging),
            (0.2, Formation::Foraging),
        ];
        assert_eq!(group_decision(&votes), Formation::Defensive);
    }

    #[test]
    fn purpose_selects_formation() {
        assert_eq!(
            formation_for_purpose(false, true, true, false),
            Formation::Assault
        );
        assert_eq!(
            formation_for_purpose(true, false, true, false),
            Formation::Defensive
        );
        assert_eq!(
            formation_for_purpose(false, false, false, true),
            Formation::Migration
        );
        assert_eq!(
            formation_for_purpose(false, false, true, false),
            Formation::Foraging
        );
    }

    #[test]
    fn best_food_is_highest_confidence() {
        let mut hive = HiveMind::default();
        remember_food(&mut hive, Position::new(10.0, 10.0), 0);
        remember_food(&mut hive, Position::new(40.0, 40.0), 0);
        decay(&mut hive, 0.9);
        remember_food(&mut hive, Position::new(40.0, 40.0), 1);
        let best = best_food(&hive).unwrap();
        assert!((best.position.x - 40.0).abs() < 1e-9);
    }
}
