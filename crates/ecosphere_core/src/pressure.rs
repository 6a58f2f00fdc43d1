//! Long-horizon environmental stressors: activation gated on world
//! indicators, a bounded active set, and named per-tick effect maps applied
//! to entities, plants, and cells inside each pressure's region.

use crate::config::PressureConfig;
use crate::genetics::MutationBias;
use ecosphere_data::{Position, TraitId};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PressureKind {
    ClimateChange,
    Pollution,
    HabitatFragmentation,
    ResourceDepletion,
    InvasiveSpecies,
    ExtremeWeather,
}

impl PressureKind {
    pub const ALL: [PressureKind; 6] = [
        PressureKind::ClimateChange,
        PressureKind::Pollution,
        PressureKind::HabitatFragmentation,
        PressureKind::ResourceDepletion,
        PressureKind::InvasiveSpecies,
        PressureKind::ExtremeWeather,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PressureKind::ClimateChange => "climate-change",
            PressureKind::Pollution => "pollution",
            PressureKind::HabitatFragmentation => "habitat-fragmentation",
            PressureKind::ResourceDepletion => "resource-depletion",
            PressureKind::InvasiveSpecies => "invasive-species",
            PressureKind::ExtremeWeather => "extreme-weather",
        }
    }
}

/// World indicators gating new pressure activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorldIndicators {
    pub population: usize,
    pub plant_count: usize,
    pub species_richness: usize,
    /// Claimed territory cells across all colonies.
    pub civilization_structures: usize,
}

/// Named per-tick effect magnitudes for one pressure at full severity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PressureEffects {
    pub temperature_shift: f32,
    pub mutation_rate_multiplier: f32,
    pub movement_penalty: f64,
    pub soil_depletion: f32,
    pub energy_drain: f64,
    pub water_loss: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pressure {
    pub kind: PressureKind,
    pub center: Position,
    pub radius: f64,
    pub severity: f32,
    pub started_tick: u64,
    /// None means permanent.
    pub duration: Option<u64>,
}

impl Pressure {
    #[must_use]
    pub fn expired(&self, tick: u64) -> bool {
        self.duration
            .is_some_and(|d| tick.saturating_sub(self.started_tick) >= d)
    }

    #[must_use]
    pub fn affects(&self, pos: &Position) -> bool {
        self.center.distance_to(pos) <= self.radius
    }

    /// Severity-scaled effect map for this pressure.
    #[must_use]
    pub fn effects(&self) -> PressureEffects {
        let s = f64::from(self.severity);
        let sf = self.severity;
        match self.kind {
            PressureKind::ClimateChange => PressureEffects {
                temperature_shift: 6.0 * sf,
                mutation_rate_multiplier: 1.0 + 0.5 * sf,
                energy_drain: 0.4 * s,
                water_loss: 0.002 * sf,
                ..Default::default()
            },
            PressureKind::Pollution => PressureEffects {
                mutation_rate_multiplier: 1.0 + 1.5 * sf,
                soil_depletion: 0.004 * sf,
                energy_drain: 0.3 * s,
                ..Default::default()
            },
            PressureKind::HabitatFragmentation => PressureEffects {
                movement_penalty: 0.3 * s,
                soil_depletion: 0.002 * sf,
                mutation_rate_multiplier: 1.0,
                ..Default::default()
            },
            PressureKind::ResourceDepletion => PressureEffects {
                soil_depletion: 0.006 * sf,
                energy_drain: 0.5 * s,
                mutation_rate_multiplier: 1.0,
                ..Default::default()
            },
            PressureKind::InvasiveSpecies => PressureEffects {
                energy_drain: 0.6 * s,
                mutation_rate_multiplier: 1.0 + 0.3 * sf,
                ..Default::default()
            },
            PressureKind::ExtremeWeather => PressureEffects {
                temperature_shift: -4.0 * sf,
                movement_penalty: 0.4 * s,
                energy_drain: 0.8 * s,
                water_loss: -0.003 * sf,
                mutation_rate_multiplier: 1.0,
                ..Default::default()
            },
        }
    }

    /// Directional mutation bias inside this pressure's region; pushes the
    /// traits that would help survive it. Components stay within the
    /// configured cap when the caller clamps.
    #[must_use]
    pub fn mutation_bias(&self) -> MutationBias {
        let mut bias = MutationBias::default();
        let s = self.severity * 0.1;
        match self.kind {
            PressureKind::ClimateChange => {
                bias.0[TraitId::Adaptability.index()] = s;
                bias.0[TraitId::EnergyEfficiency.index()] = s * 0.5;
            }
            PressureKind::Pollution => {
                bias.0[TraitId::Defense.index()] = s;
                bias.0[TraitId::Adaptability.index()] = s * 0.5;
            }
            PressureKind::HabitatFragmentation => {
                bias.0[TraitId::Flying.index()] = s;
                bias.0[TraitId::Curiosity.index()] = s * 0.5;
            }
            PressureKind::ResourceDepletion => {
                bias.0[TraitId::EnergyEfficiency.index()] = s;
                bias.0[TraitId::Endurance.index()] = s * 0.5;
            }
            PressureKind::InvasiveSpecies => {
                bias.0[TraitId::Aggression.index()] = s * 0.5;
                bias.0[TraitId::Defense.index()] = s;
            }
            PressureKind::ExtremeWeather => {
                bias.0[TraitId::Endurance.index()] = s;
                bias.0[TraitId::Digging.index()] = s * 0.5;
            }
        }
        bias
    }
}

/// The bounded set of active pressures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PressureSystem {
    pub active: Vec<Pressure>,
}

impl PressureSystem {
    /// Drop expired pressures; returns the kinds that ended this tick.
    pub fn retire(&mut self, tick: u64) -> Vec<PressureKind> {
        let mut ended = Vec::new();
        self.active.retain(|p| {
            if p.expired(tick) {
                ended.push(p.kind);
                false
            } else {
                true
            }
        });
        ended
    }

    /// Evaluate stochastic activation of a new pressure, gated on world
    /// indicators. At most one new pressure per tick and never above
    /// `max_active`.
    pub fn maybe_activate<R: Rng>(
        &mut self,
        indicators: &WorldIndicators,
        config: &PressureConfig,
        world_width: u16,
        world_height: u16,
        tick: u64,
        rng: &mut R,
    ) -> Option<Pressure> {
        if self.active.len() >= config.max_active {
            return None;
        }
        if !rng.gen_bool(config.activation_chance.clamp(0.0, 1.0)) {
            return None;
        }

        let kind = PressureKind::ALL[rng.gen_range(0..PressureKind::ALL.len())];
        let gated = match kind {
            PressureKind::Pollution => indicators.civilization_structures >= 20,
            PressureKind::HabitatFragmentation => indicators.plant_count >= 100,
            PressureKind::ResourceDepletion => indicators.population >= 50,
            PressureKind::InvasiveSpecies => indicators.species_richness >= 3,
            PressureKind::ClimateChange | PressureKind::ExtremeWeather => true,
        };
        if !gated {
            return None;
        }

        let pressure = Pressure {
            kind,
            center: Position::new(
                rng.gen_range(0.0..f64::from(world_width)),
                rng.gen_range(0.0..f64::from(world_height)),
            ),
            radius: rng.gen_range(10.0..(f64::from(world_width.max(world_height)) * 0.5).max(11.0)),
            severity: rng.gen_range(config.min_severity..=config.max_severity),
            started_tick: tick,
            duration: if rng.gen_bool(0.9) {
                Some(rng.gen_range(config.min_duration..=config.max_duration))
            } else {
                None
            },
        };
        self.active.push(pressure);
        Some(pressure)
    }

    /// Combined mutation-rate multiplier at a position.
    #[must_use]
    pub fn mutation_rate_multiplier(&self, pos: &Position) -> f32 {
        self.active
            .iter()
            .filter(|p| p.affects(pos))
            .map(|p| p.effects().mutation_rate_multiplier)
            .fold(1.0, |acc, m| acc * m.max(1.0))
    }

    /// Combined, cap-clamped mutation bias at a position.
    #[must_use]
    pub fn mutation_bias_at(&self, pos: &Position, cap: f32) -> MutationBias {
        let mut combined = MutationBias::default();
        for p in self.active.iter().filter(|p| p.affects(pos)) {
            let bias = p.mutation_bias();
            for (slot, v) in combined.0.iter_mut().zip(bias.0.iter()) {
                *slot += v;
            }
        }
        combined.clamp_to(cap);
        combined
    }
}
