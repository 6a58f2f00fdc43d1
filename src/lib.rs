//! Thin re-export layer over the Ecosphere engine crates, used by the
//! binary and the integration test suite.

pub use ecosphere_core::{config, world, SimConfig, SimError, World, WorldSnapshot};
pub use ecosphere_data as data;
