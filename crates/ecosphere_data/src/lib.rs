//! Pure data structures for the Ecosphere simulation.
//!
//! This crate contains serializable data types with no business logic,
//! shared between the simulation engine and snapshot consumers.

pub mod data;

pub use data::brain::*;
pub use data::colony::*;
pub use data::entity::*;
pub use data::event::*;
pub use data::genome::*;
pub use data::grain::*;
pub use data::plant::*;
pub use data::traits::*;
