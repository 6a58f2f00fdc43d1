//! # Ecosphere Core
//!
//! The deterministic simulation engine for Ecosphere - a tick-driven
//! agent-based evolutionary ecosystem.
//!
//! This crate contains the fixed-order tick scheduler and every subsystem
//! it composes:
//! - Heritable genetics (diploid DNA, mutation, crossover, fitness)
//! - Speciation by trait distance with phylogenetic lineage tracking
//! - Wind-field Lagrangian pollen/seed transport with germination
//! - Mycorrhizal plant networks carrying resources and chemical signals
//! - Per-entity neural decision networks with online reinforcement
//! - Caste colonies, hive-mind memory, and inter-colony warfare
//! - Environmental pressures, the event bus, and the ecosystem monitor
//!
//! ## Architecture
//!
//! The [`world::World`] exclusively owns every collection; components hold
//! id-based back-references resolved through the world's index maps inside
//! a phase. All randomness derives from a single master seed via
//! per-(tick, subsystem) sub-streams, so runs are reproducible
//! byte-for-byte. Per-element phases parallelize with rayon over disjoint
//! slots; aggregates are applied serially in id order.
//!
//! ## Example
//!
//! ```ignore
//! use ecosphere_core::config::SimConfig;
//! use ecosphere_core::world::World;
//!
//! let mut config = SimConfig::default();
//! config.world.seed = 42;
//! let mut world = World::new_seeded(config)?;
//! for _ in 0..1000 {
//!     world.step()?;
//! }
//! let snapshot = world.snapshot();
//! ```

/// Per-entity decision networks and online learning
pub mod brain;
/// Deterministic clock, day/night cycle, seasons
pub mod clock;
/// Strongly-typed configuration sections with TOML loading
pub mod config;
/// Lagrangian grain transport, seed banks, germination
pub mod dispersal;
/// Engine error taxonomy
pub mod error;
/// Append-only tick-indexed event bus
pub mod events;
/// Plant growth and per-type behavior tables
pub mod flora;
/// Heritable genetics: expression, mutation, crossover, fitness
pub mod genetics;
/// The unified world grid: biomes, soil, occupancy buckets
pub mod grid;
/// Diversity indices, trends, health score
pub mod monitor;
/// The mycorrhizal plant network
pub mod mycorrhiza;
/// Euler integration and collision resolution
pub mod physics;
/// Long-horizon environmental pressures
pub mod pressure;
/// Reproduction modes, gestation, corpse decay
pub mod reproduction;
/// Master-seed random sub-streams
pub mod rng;
/// Localized entity signalling
pub mod signals;
/// Read-only snapshots and versioned persistence
pub mod snapshot;
/// Castes, hive minds, diplomacy and warfare
pub mod society;
/// Species assignment and lineage tracking
pub mod species;
/// The wind advection field
pub mod wind;
/// The world container and the fixed-order tick
pub mod world;

pub use config::SimConfig;
pub use error::SimError;
pub use snapshot::WorldSnapshot;
pub use world::World;
