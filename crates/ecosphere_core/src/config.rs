//! Configuration management for simulation parameters.
//!
//! Strongly-typed sections map to an optional TOML file; every stochastic
//! rate used by a subsystem is a named field here, never a literal buried in
//! subsystem code.
//!
//! ## Configuration Hierarchy
//!
//! 1. Default values (hardcoded in `Default` impls)
//! 2. TOML file (overrides defaults)
//! 3. CLI flags (override both, applied by the binary)
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [world]
//! width = 100
//! height = 100
//! seed = 42
//!
//! [genetics]
//! mutation_rate = 0.2
//! ```

use ecosphere_data::Severity;
use serde::{Deserialize, Serialize};

/// World dimensions, seeding, and global limits.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WorldConfig {
    /// World width in world units; positions live in [0, width).
    pub width: u16,
    /// World height in world units; positions live in [0, height).
    pub height: u16,
    /// Master seed for every random stream.
    pub seed: u64,
    pub initial_entities: usize,
    pub initial_plants: usize,
    /// Spatial bucket edge length, sized near the max interaction radius.
    pub cell_size: f64,
    /// Run invariant checks at the end of each tick.
    pub check_invariants: bool,
    pub max_entities: usize,
    pub max_plants: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            seed: 0,
            initial_entities: 60,
            initial_plants: 120,
            cell_size: 4.0,
            check_invariants: true,
            max_entities: 5000,
            max_plants: 4000,
        }
    }
}

/// Mutation and crossover parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GeneticsConfig {
    /// Per-gene mutation probability at reproduction.
    pub mutation_rate: f32,
    /// Gaussian scale of a mutation step.
    pub mutation_strength: f32,
    /// Cap on the pressure-driven additive mean shift per trait.
    pub pressure_bias_cap: f32,
}

impl Default for GeneticsConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.1,
            mutation_strength: 0.2,
            pressure_bias_cap: 0.1,
        }
    }
}

/// Species assignment and lineage parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SpeciationConfig {
    /// Reassignment cadence in ticks.
    pub interval: u64,
    /// Max trait distance to an existing centroid for assignment.
    pub assign_threshold: f32,
    /// Max distance for a new species to record a parent lineage.
    pub parent_threshold: f32,
    /// Minimum cluster size to found a species.
    pub min_species_size: usize,
    /// Ticks at zero members before a species is marked extinct.
    pub extinction_ticks: u64,
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        Self {
            interval: 50,
            assign_threshold: 0.4,
            parent_threshold: 0.5,
            min_species_size: 3,
            extinction_ticks: 100,
        }
    }
}

/// Plant growth and mycorrhizal network parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FloraConfig {
    /// Link-formation cadence in ticks.
    pub link_interval: u64,
    pub max_links: usize,
    pub link_radius: f64,
    pub link_initial_strength: f32,
    /// Donors share only energy above this fraction of their cap.
    pub donor_fraction: f32,
    /// Recipients receive only below this fraction of their cap.
    pub recipient_fraction: f32,
    /// Multiplicative decay applied per chemical-signal hop.
    pub signal_decay: f32,
    /// Base growth step when soil and water suffice.
    pub growth_rate: f32,
    /// Seeds a single cell bank can hold.
    pub seed_bank_capacity: usize,
}

impl Default for FloraConfig {
    fn default() -> Self {
        Self {
            link_interval: 25,
            max_links: 5,
            link_radius: 6.0,
            link_initial_strength: 0.3,
            donor_fraction: 0.6,
            recipient_fraction: 0.35,
            signal_decay: 0.6,
            growth_rate: 0.15,
            seed_bank_capacity: 32,
        }
    }
}

/// Wind field and grain transport parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WindConfig {
    /// Magnitude of the prevailing wind before seasonal scaling.
    pub prevailing_speed: f64,
    /// Radians of prevailing-direction drift per tick.
    pub prevailing_drift: f64,
    /// Spatial frequency of the turbulence noise field.
    pub turbulence_scale: f64,
    /// Amplitude of the turbulence contribution.
    pub turbulence_strength: f64,
    /// Coupling between wind and grain velocity.
    pub drag_factor: f64,
    /// Per-tick chance a storm spawns.
    pub storm_chance: f64,
    pub storm_duration: u32,
    /// Grain pool cap; new grains are rejected above it.
    pub max_grains: usize,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            prevailing_speed: 0.8,
            prevailing_drift: 0.01,
            turbulence_scale: 0.05,
            turbulence_strength: 0.4,
            drag_factor: 0.6,
            storm_chance: 0.002,
            storm_duration: 200,
            max_grains: 2000,
        }
    }
}

/// Integration and collision parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Baseline velocity damping; biomes scale it.
    pub base_friction: f64,
    /// Fraction of approach velocity preserved on contact.
    pub restitution: f64,
    pub max_speed: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            base_friction: 0.1,
            restitution: 0.2,
            max_speed: 3.0,
        }
    }
}

/// Entity signalling parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SignalConfig {
    /// Signal pool cap; oldest are evicted above it.
    pub max_signals: usize,
    pub default_duration: u32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            max_signals: 1024,
            default_duration: 10,
        }
    }
}

/// Mating, gestation, and decay parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ReproductionConfig {
    /// Fraction of energy cap required to mate.
    pub energy_threshold_fraction: f64,
    /// Fraction of parent energy granted to each offspring.
    pub offspring_energy_fraction: f64,
    pub egg_hatch_period: u32,
    pub gestation_period: u32,
    pub budding_cost: f64,
    pub cooldown_ticks: u64,
    /// Baseline cross-species mating allow-rate before similarity modulation.
    pub cross_species_base_rate: f32,
    /// Ticks over which a corpse releases its nutrients.
    pub decay_period: u32,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            energy_threshold_fraction: 0.5,
            offspring_energy_fraction: 0.3,
            egg_hatch_period: 40,
            gestation_period: 60,
            budding_cost: 80.0,
            cooldown_ticks: 30,
            cross_species_base_rate: 0.05,
            decay_period: 50,
        }
    }
}

/// Colony formation, caste quotas, and warfare parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ColonyConfig {
    pub min_members: usize,
    pub cooperation_threshold: f32,
    pub intelligence_threshold: f32,
    pub formation_radius: f64,
    /// Caste quota: max fraction of soldiers.
    pub soldier_quota: f32,
    /// Caste quota: max fraction of scouts.
    pub scout_quota: f32,
    /// Per-tick multiplicative decay of hive-memory confidence.
    pub memory_decay: f32,
    /// Shared territory cells needed before relations escalate.
    pub border_overlap_threshold: usize,
    /// Diplomacy/warfare evaluation cadence in ticks.
    pub conflict_interval: u64,
    /// Fraction of traded stock that survives distance/trust scaling.
    pub trade_efficiency: f64,
    pub max_colonies: usize,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            min_members: 3,
            cooperation_threshold: 0.3,
            intelligence_threshold: 0.3,
            formation_radius: 8.0,
            soldier_quota: 0.2,
            scout_quota: 0.1,
            memory_decay: 0.995,
            border_overlap_threshold: 3,
            conflict_interval: 20,
            trade_efficiency: 0.8,
            max_colonies: 64,
        }
    }
}

/// Per-entity decision network parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct NeuralConfig {
    /// Intelligence below which no network is instantiated.
    pub intelligence_threshold: f32,
    /// Hidden width = hidden_base + intelligence * hidden_scale.
    pub hidden_base: usize,
    pub hidden_scale: f32,
    /// Peak learning rate; decays with entity age.
    pub learning_rate: f32,
    /// Age (ticks) at which the learning rate has halved.
    pub learning_halflife: f64,
    pub init_weight_std: f32,
    /// Offspring start from a noise-perturbed copy of the parent network.
    pub inherit_weights: bool,
    pub inherit_noise_std: f32,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            intelligence_threshold: 0.3,
            hidden_base: 4,
            hidden_scale: 8.0,
            learning_rate: 0.05,
            learning_halflife: 500.0,
            init_weight_std: 0.1,
            inherit_weights: false,
            inherit_noise_std: 0.05,
        }
    }
}

/// Long-horizon environmental stressor parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PressureConfig {
    pub max_active: usize,
    /// Per-tick chance a new pressure is evaluated for activation.
    pub activation_chance: f64,
    pub min_severity: f32,
    pub max_severity: f32,
    pub min_duration: u64,
    pub max_duration: u64,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            max_active: 3,
            activation_chance: 0.002,
            min_severity: 0.2,
            max_severity: 0.9,
            min_duration: 200,
            max_duration: 2000,
        }
    }
}

/// Event bus retention parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EventConfig {
    /// Events older than this are candidates for pruning.
    pub retention_ticks: u64,
    /// Events at or above this severity survive pruning.
    pub keep_severity: Severity,
    /// Hard cap on retained events.
    pub max_events: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            retention_ticks: 2000,
            keep_severity: Severity::Warning,
            max_events: 100_000,
        }
    }
}

/// Ecosystem monitor parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval: u64,
    /// Samples in the trend regression window.
    pub trend_window: usize,
    pub weight_diversity: f64,
    pub weight_connectivity: f64,
    pub weight_stability: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: 20,
            trend_window: 10,
            weight_diversity: 0.4,
            weight_connectivity: 0.3,
            weight_stability: 0.3,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub genetics: GeneticsConfig,
    pub speciation: SpeciationConfig,
    pub flora: FloraConfig,
    pub wind: WindConfig,
    pub physics: PhysicsConfig,
    pub signals: SignalConfig,
    pub reproduction: ReproductionConfig,
    pub colony: ColonyConfig,
    pub neural: NeuralConfig,
    pub pressure: PressureConfig,
    pub events: EventConfig,
    pub monitor: MonitorConfig,
}

impl SimConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` describing the
    /// first failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.world.width > 0, "World width must be positive");
        anyhow::ensure!(self.world.height > 0, "World height must be positive");
        anyhow::ensure!(
            self.world.width <= 2000 && self.world.height <= 2000,
            "World dimensions too large (max 2000)"
        );
        anyhow::ensure!(self.world.cell_size > 0.0, "Cell size must be positive");
        anyhow::ensure!(
            self.world.initial_entities <= self.world.max_entities,
            "Initial entities exceed max_entities"
        );
        anyhow::ensure!(
            self.world.initial_plants <= self.world.max_plants,
            "Initial plants exceed max_plants"
        );

        anyhow::ensure!(
            (0.0..=1.0).contains(&self.genetics.mutation_rate),
            "Mutation rate must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.genetics.mutation_strength >= 0.0,
            "Mutation strength must be non-negative"
        );
        anyhow::ensure!(
            (0.0..=0.1).contains(&self.genetics.pressure_bias_cap),
            "Pressure bias cap must be in [0.0, 0.1]"
        );

        anyhow::ensure!(self.speciation.interval > 0, "Speciation interval must be positive");
        anyhow::ensure!(
            self.speciation.assign_threshold > 0.0,
            "Species assignment threshold must be positive"
        );
        anyhow::ensure!(
            self.speciation.parent_threshold >= self.speciation.assign_threshold,
            "Parent threshold must be at least the assignment threshold"
        );
        anyhow::ensure!(
            self.speciation.min_species_size >= 1,
            "Minimum species size must be at least 1"
        );

        anyhow::ensure!(self.flora.max_links >= 1, "Max links must be at least 1");
        anyhow::ensure!(self.flora.link_radius > 0.0, "Link radius must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.flora.donor_fraction)
                && (0.0..=1.0).contains(&self.flora.recipient_fraction),
            "Sharing fractions must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.flora.recipient_fraction < self.flora.donor_fraction,
            "Recipient fraction must be below donor fraction"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.flora.signal_decay),
            "Signal decay must be in [0.0, 1.0]"
        );

        anyhow::ensure!(
            self.wind.drag_factor >= 0.0,
            "Wind drag factor must be non-negative"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.wind.storm_chance),
            "Storm chance must be in [0.0, 1.0]"
        );
        anyhow::ensure!(self.wind.max_grains > 0, "Grain pool cap must be positive");

        anyhow::ensure!(
            (0.0..=1.0).contains(&self.physics.base_friction),
            "Friction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.physics.restitution),
            "Restitution must be in [0.0, 1.0]"
        );
        anyhow::ensure!(self.physics.max_speed > 0.0, "Max speed must be positive");

        anyhow::ensure!(
            (0.0..=1.0).contains(&self.reproduction.energy_threshold_fraction),
            "Mating energy threshold must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            (0.0..=0.5).contains(&self.reproduction.offspring_energy_fraction),
            "Offspring energy fraction must be in [0.0, 0.5]"
        );
        anyhow::ensure!(
            self.reproduction.decay_period > 0,
            "Decay period must be positive"
        );

        anyhow::ensure!(
            self.colony.min_members >= 3,
            "Colony formation requires at least 3 members"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.colony.soldier_quota)
                && (0.0..=1.0).contains(&self.colony.scout_quota),
            "Caste quotas must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.colony.memory_decay),
            "Memory decay must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.colony.trade_efficiency),
            "Trade efficiency must be in [0.0, 1.0]"
        );

        anyhow::ensure!(
            (0.0..=1.0).contains(&self.neural.intelligence_threshold),
            "Neural intelligence threshold must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.neural.learning_rate),
            "Learning rate must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.neural.learning_halflife > 0.0,
            "Learning halflife must be positive"
        );

        anyhow::ensure!(
            self.pressure.max_active >= 1,
            "Max active pressures must be at least 1"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.pressure.activation_chance),
            "Pressure activation chance must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.pressure.min_severity <= self.pressure.max_severity
                && (0.0..=1.0).contains(&self.pressure.min_severity)
                && (0.0..=1.0).contains(&self.pressure.max_severity),
            "Pressure severities must be an ordered pair in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.pressure.min_duration <= self.pressure.max_duration,
            "Pressure durations must be an ordered pair"
        );

        anyhow::ensure!(self.events.max_events > 0, "Event cap must be positive");
        anyhow::ensure!(self.monitor.interval > 0, "Monitor interval must be positive");
        anyhow::ensure!(
            self.monitor.trend_window >= 2,
            "Trend window needs at least 2 samples"
        );

        Ok(())
    }

    /// Loads and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }
}
