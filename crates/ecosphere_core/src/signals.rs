//! Localized entity signalling: bounded-range emission, biome attenuation,
//! and linear decay over a signal's lifetime.
//!
//! Emission is instantaneous but receivers act on what they hear in the
//! entity-update phase of the *next* tick, so emission order within a tick
//! never matters.

use crate::grid::Biome;
use ecosphere_data::{EntityId, Position};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Alert,
    FoodFound,
    MatingCall,
    Territorial,
    Distress,
    Aggression,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub origin: EntityId,
    pub position: Position,
    pub strength: f32,
    pub range: f64,
    pub emitted_tick: u64,
    pub duration: u32,
}

impl Signal {
    /// Remaining strength factor at `tick`, decaying linearly to zero.
    #[must_use]
    pub fn decay_factor(&self, tick: u64) -> f32 {
        let age = tick.saturating_sub(self.emitted_tick) as f32;
        (1.0 - age / self.duration.max(1) as f32).max(0.0)
    }

    #[must_use]
    pub fn is_expired(&self, tick: u64) -> bool {
        tick.saturating_sub(self.emitted_tick) >= u64::from(self.duration)
    }

    /// Effective strength heard at `at`, or None outside the range.
    #[must_use]
    pub fn heard_at(&self, at: &Position, biome: Biome, tick: u64) -> Option<f32> {
        let distance = self.position.distance_to(at);
        if distance > self.range {
            return None;
        }
        let falloff = 1.0 - (distance / self.range.max(1e-9)) as f32;
        let strength =
            self.strength * falloff * biome.signal_attenuation() * self.decay_factor(tick);
        (strength > 1e-3).then_some(strength)
    }
}

/// Per-tick ring of active signals with a hard pool cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SignalBoard {
    pub signals: Vec<Signal>,
}

impl SignalBoard {
    /// Post a signal. Returns the number of evicted signals when the pool
    /// was full (oldest are dropped first).
    pub fn emit(&mut self, signal: Signal, max_signals: usize) -> usize {
        self.signals.push(signal);
        if self.signals.len() > max_signals {
            let overflow = self.signals.len() - max_signals;
            self.signals.drain(..overflow);
            overflow
        } else {
            0
        }
    }

    /// Drop expired signals; called once per tick.
    pub fn retire(&mut self, tick: u64) {
        self.signals.retain(|s| !s.is_expired(tick));
    }

    /// All signals audible at a position, with their effective strengths.
    /// Excludes the receiver's own emissions.
    #[must_use]
    pub fn heard_by(
        &self,
        receiver: EntityId,
        at: &Position,
        biome: Biome,
        tick: u64,
    ) -> Vec<(SignalKind, f32, Position)> {
        self.signals
            .iter()
            .filter(|s| s.origin != receiver)
            .filter_map(|s| s.heard_at(at, biome, tick).map(|v| (s.kind, v, s.position)))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(strength: f32, tick: u64) -> Signal {
        Signal {
            kind: SignalKind::Alert,
            origin: EntityId(1),
            position: Position::new(10.0, 10.0),
            strength,
            range: 10.0,
            emitted_tick: tick,
            duration: 10,
        }
    }

    #[test]
    fn strength_falls_off_with_distance() {
        let s = signal(1.0, 0);
        let near = s
            .heard_at(&Position::new(11.0, 10.0), Biome::Plains, 0)
            .unwrap();
        let far = s
            .heard_at(&Position::new(18.0, 10.0), Biome::Plains, 0)
            .unwrap();
        assert!(near > far);
        assert!(s.heard_at(&Position::new(25.0, 10.0), Biome::Plains, 0).is_none());
    }

    #[test]
    fn decay_is_linear_and_terminal() {
        let s = signal(1.0, 0);
        assert!((s.decay_factor(0) - 1.0).abs() < 1e-6);
        assert!((s.decay_factor(5) - 0.5).abs() < 1e-6);
        assert_eq!(s.decay_factor(10), 0.0);
        assert!(s.is_expired(10));
    }

    #[test]
    fn pool_cap_evicts_oldest() {
        let mut board = SignalBoard::default();
        for i in 0..5 {
            let evicted = board.emit(signal(1.0, i), 3);
            if i < 3 {
                assert_eq!(evicted, 0);
            } else {
                assert_eq!(evicted, 1);
            }
        }
        assert_eq!(board.len(), 3);
        assert_eq!(board.signals[0].emitted_tick, 2);
    }

    #[test]
    fn receiver_does_not_hear_itself() {
        let mut board = SignalBoard::default();
        board.emit(signal(1.0, 0), 16);
        let own = board.heard_by(EntityId(1), &Position::new(10.0, 10.0), Biome::Plains, 0);
        let other = board.heard_by(EntityId(2), &Position::new(10.0, 10.0), Biome::Plains, 0);
        assert!(own.is_empty());
        assert_eq!(other.len(), 1);
    }
}
