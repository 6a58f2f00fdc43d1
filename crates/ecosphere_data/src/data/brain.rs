use serde::{Deserialize, Serialize};

/// Number of sensory inputs: vision, energy, threat, food, social.
pub const BRAIN_INPUTS: usize = 5;
/// Number of outputs: move_x, move_y, action intensity.
pub const BRAIN_OUTPUTS: usize = 3;
/// Minimum length of the recent-decision reward ring.
pub const DECISION_RING: usize = 64;

/// One dense layer: `weights` is row-major `[outputs x inputs]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

/// A small per-entity feed-forward decision network.
///
/// Weight buffers are owned by the entity and survive for its lifetime; the
/// reward ring backs the running success rate. `decisions` counts forward
/// passes and is maintained by the engine's decide step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brain {
    pub layers: Vec<Layer>,
    /// Ring buffer of recent rewards in [-1, 1].
    pub recent_rewards: Vec<f32>,
    pub ring_head: usize,
    pub ring_filled: usize,
    pub decisions: u64,
    /// Moving average of positive outcomes over the reward ring.
    pub success_rate: f32,
    /// Input activations from the last forward pass, kept for learning.
    pub last_inputs: [f32; BRAIN_INPUTS],
    /// Output activations from the last forward pass.
    pub last_outputs: [f32; BRAIN_OUTPUTS],
}

impl Brain {
    /// Record a reward and refresh the running success rate.
    pub fn record_reward(&mut self, reward: f32) {
        let reward = reward.clamp(-1.0, 1.0);
        if self.recent_rewards.len() < DECISION_RING {
            self.recent_rewards.resize(DECISION_RING, 0.0);
        }
        self.recent_rewards[self.ring_head] = reward;
        self.ring_head = (self.ring_head + 1) % self.recent_rewards.len();
        self.ring_filled = (self.ring_filled + 1).min(self.recent_rewards.len());

        let filled = &self.recent_rewards[..self.ring_filled];
        let positive = filled.iter().filter(|r| **r > 0.0).count();
        self.success_rate = positive as f32 / self.ring_filled.max(1) as f32;
    }

    #[must_use]
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.layers.len() + 1);
        if let Some(first) = self.layers.first() {
            sizes.push(first.inputs);
        }
        sizes.extend(self.layers.iter().map(|l| l.outputs));
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_brain() -> Brain {
        Brain {
            layers: vec![Layer {
                inputs: BRAIN_INPUTS,
                outputs: BRAIN_OUTPUTS,
                weights: vec![0.0; BRAIN_INPUTS * BRAIN_OUTPUTS],
                biases: vec![0.0; BRAIN_OUTPUTS],
            }],
            recent_rewards: Vec::new(),
            ring_head: 0,
            ring_filled: 0,
            decisions: 0,
            success_rate: 0.0,
            last_inputs: [0.0; BRAIN_INPUTS],
            last_outputs: [0.0; BRAIN_OUTPUTS],
        }
    }

    #[test]
    fn success_rate_tracks_positive_fraction() {
        let mut brain = empty_brain();
        for _ in 0..32 {
            brain.record_reward(1.0);
        }
        for _ in 0..32 {
            brain.record_reward(-1.0);
        }
        assert!((brain.success_rate - 0.5).abs() < 1e-6);
    }

    #[test]
    fn ring_wraps_without_growing() {
        let mut brain = empty_brain();
        for i in 0..200 {
            brain.record_reward(if i % 2 == 0 { 0.5 } else { -0.5 });
        }
        assert_eq!(brain.recent_rewards.len(), DECISION_RING);
        assert_eq!(brain.ring_filled, DECISION_RING);
    }

    #[test]
    fn layer_sizes_roundtrip() {
        let brain = empty_brain();
        assert_eq!(brain.layer_sizes(), vec![BRAIN_INPUTS, BRAIN_OUTPUTS]);
    }
}
