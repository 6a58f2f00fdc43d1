//! The ecosystem monitor: diversity indices, trend classification over a
//! sliding sample window, and the composite health score.

use crate::config::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Shannon diversity H = -sum p_i ln p_i over population fractions.
#[must_use]
pub fn shannon(populations: &[usize]) -> f64 {
    let total: usize = populations.iter().sum();
    if total == 0 {
        return 0.0;
    }
    populations
        .iter()
        .filter(|&&n| n > 0)
        .map(|&n| {
            let p = n as f64 / total as f64;
            -p * p.ln()
        })
        .sum()
}

/// Simpson diversity D = 1 - sum p_i^2.
#[must_use]
pub fn simpson(populations: &[usize]) -> f64 {
    let total: usize = populations.iter().sum();
    if total == 0 {
        return 0.0;
    }
    1.0 - populations
        .iter()
        .map(|&n| {
            let p = n as f64 / total as f64;
            p * p
        })
        .sum::<f64>()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Growing,
    Declining,
    Stable,
    InsufficientData,
}

/// Least-squares slope of evenly spaced samples.
fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let mean_x = (n - 1.0) / 2.0;
    let mean_y: f64 = values.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den.abs() < 1e-12 {
        0.0
    } else {
        num / den
    }
}

fn classify(values: &[f64]) -> Trend {
    if values.len() < 3 {
        return Trend::InsufficientData;
    }
    let scale = values
        .iter()
        .fold(0.0f64, |acc, v| acc.max(v.abs()))
        .max(1e-9);
    let s = slope(values) / scale;
    if s > 0.01 {
        Trend::Growing
    } else if s < -0.01 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub tick: u64,
    pub shannon: f64,
    pub simpson: f64,
    pub richness: usize,
    pub connectivity: f64,
    pub health_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trends {
    pub shannon: Trend,
    pub simpson: Trend,
    pub richness: Trend,
    pub connectivity: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EcosystemMonitor {
    pub samples: VecDeque<MetricSample>,
}

impl EcosystemMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one measurement and compute the health score from the current
    /// window. `species_populations` holds member counts for each active
    /// species (entities and plants alike).
    pub fn sample(
        &mut self,
        species_populations: &[usize],
        connectivity: f64,
        config: &MonitorConfig,
        tick: u64,
    ) -> MetricSample {
        let h = shannon(species_populations);
        let d = simpson(species_populations);
        let richness = species_populations.iter().filter(|&&n| n > 0).count();

        // Normalized diversity: H relative to its maximum ln(richness).
        let diversity_norm = if richness > 1 {
            (h / (richness as f64).ln()).clamp(0.0, 1.0)
        } else {
            0.0
        };

        // Stability: inverse of the relative swing of recent health inputs.
        let stability = {
            let recent: Vec<f64> = self
                .samples
                .iter()
                .rev()
                .take(config.trend_window)
                .map(|s| s.shannon)
                .collect();
            if recent.len() < 2 {
                0.5
            } else {
                let scale = recent.iter().fold(0.0f64, |a, v| a.max(v.abs())).max(1e-9);
                (1.0 - (slope(&recent).abs() / scale) * 10.0).clamp(0.0, 1.0)
            }
        };

        let health_score = ((diversity_norm * config.weight_diversity
            + connectivity.clamp(0.0, 1.0) * config.weight_connectivity
            + stability * config.weight_stability)
            / (config.weight_diversity + config.weight_connectivity + config.weight_stability)
            * 100.0)
            .clamp(0.0, 100.0);

        let sample = MetricSample {
            tick,
            shannon: h,
            simpson: d,
            richness,
            connectivity,
            health_score,
        };
        self.samples.push_back(sample);
        while self.samples.len() > config.trend_window * 4 {
            self.samples.pop_front();
        }
        sample
    }

    #[must_use]
    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    /// Per-metric linear-slope trends over the last `trend_window` samples.
    #[must_use]
    pub fn trends(&self, config: &MonitorConfig) -> Trends {
        let window: Vec<&MetricSample> = self
            .samples
            .iter()
            .rev()
            .take(config.trend_window)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let series = |f: fn(&MetricSample) -> f64| -> Vec<f64> {
            window.iter().map(|s| f(s)).collect()
        };

        Trends {
            shannon: classify(&series(|s| s.shannon)),
            simpson: classify(&series(|s| s.simpson)),
            richness: classify(&series(|s| s.richness as f64)),
            connectivity: classify(&series(|s| s.connectivity)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shannon_of_even_split_is_ln_n() {
        let h = shannon(&[10, 10, 10, 10]);
        assert!((h - 4.0f64.ln()).abs() < 1e-9);
        assert_eq!(shannon(&[]), 0.0);
        assert_eq!(shannon(&[42]), 0.0);
    }

    #[test]
    fn simpson_rises_with_evenness() {
        let even = simpson(&[10, 10]);
        let skewed = simpson(&[19, 1]);
        assert!(even > skewed);
        assert!((even - 0.5).abs() < 1e-9);
    }

    #[test]
    fn trends_need_enough_samples() {
        let config = MonitorConfig::default();
        let mut monitor = EcosystemMonitor::new();
        monitor.sample(&[5, 5], 0.1, &config, 0);
        let trends = monitor.trends(&config);
        assert_eq!(trends.shannon, Trend::InsufficientData);
    }

    #[test]
    fn growing_richness_is_detected() {
        let config = MonitorConfig::default();
        let mut monitor = EcosystemMonitor::new();
        for i in 1..=8usize {
            let populations: Vec<usize> = vec![10; i + 1];
            monitor.sample(&populations, 0.1, &config, i as u64 * 20);
        }
        let trends = monitor.trends(&config);
        assert_eq!(trends.richness, Trend::Growing);
    }

    #[test]
    fn flat_series_is_stable() {
        let config = MonitorConfig::default();
        let mut monitor = EcosystemMonitor::new();
        for i in 0..8 {
            monitor.sample(&[10, 10, 10], 0.2, &config, i * 20);
        }
        let trends = monitor.trends(&config);
        assert_eq!(trends.shannon, Trend::Stable);
        assert_eq!(trends.connectivity, Trend::Stable);
    }

    #[test]
    fn health_score_in_bounds_and_rewards_diversity() {
        let config = MonitorConfig::default();
        let mut rich = EcosystemMonitor::new();
        let mut poor = EcosystemMonitor::new();
        let mut rich_score = 0.0;
        let mut poor_score = 0.0;
        for i in 0..6 {
            rich_score = rich
                .sample(&[10, 10, 10, 10], 0.5, &config, i * 20)
                .health_score;
            poor_score = poor.sample(&[40], 0.0, &config, i * 20).health_score;
        }
        assert!((0.0..=100.0).contains(&rich_score));
        assert!(rich_score > poor_score);
    }

    #[test]
    fn zero_population_sample_is_well_defined() {
        let config = MonitorConfig::default();
        let mut monitor = EcosystemMonitor::new();
        let s = monitor.sample(&[], 0.0, &config, 0);
        assert_eq!(s.richness, 0);
        assert_eq!(s.shannon, 0.0);
        assert!((0.0..=100.0).contains(&s.health_score));
    }
}
