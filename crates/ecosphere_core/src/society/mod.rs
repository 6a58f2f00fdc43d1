//! Colony society: caste assignment, the hive-mind collective memory, and
//! inter-colony diplomacy and warfare.

pub mod castes;
pub mod hive;
pub mod warfare;
