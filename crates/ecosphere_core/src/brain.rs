//! Per-entity decision networks: lazy instantiation, forward pass, and the
//! online delta-rule update driven by local outcomes.

use crate::config::NeuralConfig;
use ecosphere_data::{Brain, Layer, BRAIN_INPUTS, BRAIN_OUTPUTS};
use rand::Rng;

/// Sensory inputs gathered in the perception step, each pre-scaled to
/// roughly [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensoryInputs {
    pub vision: f32,
    pub energy: f32,
    pub threat: f32,
    pub food: f32,
    pub social: f32,
}

impl SensoryInputs {
    #[must_use]
    pub fn as_array(&self) -> [f32; BRAIN_INPUTS] {
        [self.vision, self.energy, self.threat, self.food, self.social]
    }
}

/// Action produced by a forward pass, merged into next-tick velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Decision {
    pub move_x: f32,
    pub move_y: f32,
    pub intensity: f32,
}

/// Hidden width scales with intelligence.
#[must_use]
pub fn hidden_width(intelligence: f32, config: &NeuralConfig) -> usize {
    config.hidden_base + (intelligence.max(0.0) * config.hidden_scale) as usize
}

fn random_layer<R: Rng>(inputs: usize, outputs: usize, std: f32, rng: &mut R) -> Layer {
    Layer {
        inputs,
        outputs,
        weights: (0..inputs * outputs)
            .map(|_| crate::genetics::gaussian(rng) * std)
            .collect(),
        biases: (0..outputs)
            .map(|_| crate::genetics::gaussian(rng) * std)
            .collect(),
    }
}

/// Instantiate a fresh network sized by intelligence.
#[must_use]
pub fn instantiate<R: Rng>(intelligence: f32, config: &NeuralConfig, rng: &mut R) -> Brain {
    let hidden = hidden_width(intelligence, config);
    Brain {
        layers: vec![
            random_layer(BRAIN_INPUTS, hidden, config.init_weight_std, rng),
            random_layer(hidden, BRAIN_OUTPUTS, config.init_weight_std, rng),
        ],
        recent_rewards: Vec::new(),
        ring_head: 0,
        ring_filled: 0,
        decisions: 0,
        success_rate: 0.0,
        last_inputs: [0.0; BRAIN_INPUTS],
        last_outputs: [0.0; BRAIN_OUTPUTS],
    }
}

/// Copy the parent network with Gaussian perturbation; learning state is
/// reset so the offspring's success rate is its own.
#[must_use]
pub fn inherit<R: Rng>(parent: &Brain, config: &NeuralConfig, rng: &mut R) -> Brain {
    let mut child = parent.clone();
    for layer in &mut child.layers {
        for w in &mut layer.weights {
            *w += crate::genetics::gaussian(rng) * config.inherit_noise_std;
        }
        for b in &mut layer.biases {
            *b += crate::genetics::gaussian(rng) * config.inherit_noise_std;
        }
    }
    child.recent_rewards.clear();
    child.ring_head = 0;
    child.ring_filled = 0;
    child.decisions = 0;
    child.success_rate = 0.0;
    child.last_inputs = [0.0; BRAIN_INPUTS];
    child.last_outputs = [0.0; BRAIN_OUTPUTS];
    child
}

fn layer_forward(layer: &Layer, input: &[f32], output: &mut Vec<f32>) {
    output.clear();
    output.reserve(layer.outputs);
    for o in 0..layer.outputs {
        let mut sum = layer.biases[o];
        let row = &layer.weights[o * layer.inputs..(o + 1) * layer.inputs];
        for (w, x) in row.iter().zip(input.iter()) {
            sum += w * x;
        }
        output.push(sum.tanh());
    }
}

/// Run the forward pass, caching activations on the brain for learning.
pub fn decide(brain: &mut Brain, inputs: [f32; BRAIN_INPUTS]) -> Decision {
    brain.decisions += 1;
    brain.last_inputs = inputs;
    let mut current: Vec<f32> = inputs.to_vec();
    let mut next: Vec<f32> = Vec::new();
    for layer in &brain.layers {
        layer_forward(layer, &current, &mut next);
        std::mem::swap(&mut current, &mut next);
    }

    let mut outputs = [0.0; BRAIN_OUTPUTS];
    for (slot, v) in outputs.iter_mut().zip(current.iter()) {
        *slot = *v;
    }
    brain.last_outputs = outputs;

    Decision {
        move_x: outputs[0],
        move_y: outputs[1],
        intensity: outputs[2].abs(),
    }
}

/// Age-decayed learning rate.
#[must_use]
pub fn learning_rate(age: u64, config: &NeuralConfig) -> f32 {
    config.learning_rate / (1.0 + age as f64 / config.learning_halflife) as f32
}

/// Delta-rule update from the last decision's cached activations:
/// `w += eta * reward * pre * post`, weights clamped to [-5, 5].
pub fn learn(brain: &mut Brain, reward: f32, eta: f32) {
    let reward = reward.clamp(-1.0, 1.0);
    if eta.abs() < 1e-6 || reward.abs() < 1e-6 {
        brain.record_reward(reward);
        return;
    }

    // Recompute intermediate activations from the cached inputs.
    let mut activations: Vec<Vec<f32>> = Vec::with_capacity(brain.layers.len() + 1);
    activations.push(brain.last_inputs.to_vec());
    let mut scratch = Vec::new();
    for layer in &brain.layers {
        layer_forward(layer, activations.last().expect("seeded above"), &mut scratch);
        activations.push(scratch.clone());
    }

    for (l, layer) in brain.layers.iter_mut().enumerate() {
        let pre = &activations[l];
        let post = &activations[l + 1];
        for o in 0..layer.outputs {
            for i in 0..layer.inputs {
                let delta = eta * reward * pre[i] * post[o];
                let w = &mut layer.weights[o * layer.inputs + i];
                *w = (*w + delta).clamp(-5.0, 5.0);
            }
        }
    }

    brain.record_reward(reward);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_brain(seed: u64) -> Brain {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        instantiate(0.8, &NeuralConfig::default(), &mut rng)
    }

    #[test]
    fn hidden_width_scales_with_intelligence() {
        let config = NeuralConfig::default();
        assert!(hidden_width(0.9, &config) > hidden_width(0.3, &config));
        assert_eq!(hidden_width(0.0, &config), config.hidden_base);
    }

    #[test]
    fn forward_is_deterministic_and_bounded() {
        let mut a = test_brain(42);
        let mut b = a.clone();
        let inputs = [0.5, -0.2, 0.1, 0.9, 0.0];
        let da = decide(&mut a, inputs);
        let db = decide(&mut b, inputs);
        assert_eq!(da, db);
        assert!(da.move_x.abs() <= 1.0 && da.move_y.abs() <= 1.0);
        assert!((0.0..=1.0).contains(&da.intensity));
    }

    #[test]
    fn learning_moves_outputs_toward_rewarded_action() {
        let mut brain = test_brain(7);
        let inputs = [0.8, 0.1, 0.0, 0.6, 0.2];
        let before = decide(&mut brain, inputs);
        for _ in 0..50 {
            decide(&mut brain, inputs);
            learn(&mut brain, 1.0, 0.1);
        }
        let after = decide(&mut brain, inputs);
        // Rewarding an action repeatedly amplifies it.
        assert!(after.move_x.abs() >= before.move_x.abs());
        assert!(brain.success_rate > 0.9);
    }

    #[test]
    fn weights_stay_clamped_under_learning() {
        let mut brain = test_brain(9);
        let inputs = [1.0; BRAIN_INPUTS];
        for _ in 0..500 {
            decide(&mut brain, inputs);
            learn(&mut brain, 1.0, 0.5);
        }
        for layer in &brain.layers {
            assert!(layer.weights.iter().all(|w| w.abs() <= 5.0));
        }
    }

    #[test]
    fn learning_rate_decays_with_age() {
        let config = NeuralConfig::default();
        assert!(learning_rate(0, &config) > learning_rate(1000, &config));
    }

    #[test]
    fn inherited_brain_resets_history() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut parent = test_brain(3);
        parent.record_reward(1.0);
        let child = inherit(&parent, &NeuralConfig::default(), &mut rng);
        assert_eq!(child.decisions, 0);
        assert_eq!(child.success_rate, 0.0);
        assert_eq!(child.layers.len(), parent.layers.len());
    }
}
