use super::entity::{EntityId, Position};
use serde::{Deserialize, Serialize};

/// Unique colony identifier; monotonically allocated, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ColonyId(pub u32);

/// Specialization label for colony members. Assignment modifies traits
/// (clamped) and the member's reproductive multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CasteRole {
    Worker,
    Soldier,
    Queen,
    Drone,
    Scout,
    Nurse,
    Builder,
    Specialist,
}

impl CasteRole {
    pub const ALL: [CasteRole; 8] = [
        CasteRole::Worker,
        CasteRole::Soldier,
        CasteRole::Queen,
        CasteRole::Drone,
        CasteRole::Scout,
        CasteRole::Nurse,
        CasteRole::Builder,
        CasteRole::Specialist,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            CasteRole::Worker => 0,
            CasteRole::Soldier => 1,
            CasteRole::Queen => 2,
            CasteRole::Drone => 3,
            CasteRole::Scout => 4,
            CasteRole::Nurse => 5,
            CasteRole::Builder => 6,
            CasteRole::Specialist => 7,
        }
    }
}

/// One remembered location in a colony's collective memory. Confidence
/// decays per tick; entries are dropped near zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub position: Position,
    pub confidence: f32,
    pub recorded_tick: u64,
}

/// Shared colony memory: food sources, threats, safe zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HiveMind {
    pub food_sources: Vec<MemoryEntry>,
    pub threats: Vec<MemoryEntry>,
    pub safe_zones: Vec<MemoryEntry>,
}

/// Movement formation selected by the hive mind for a given purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formation {
    Foraging,
    Defensive,
    Migration,
    Assault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    pub id: ColonyId,
    pub queens: Vec<EntityId>,
    pub members: Vec<EntityId>,
    /// Member count per caste, indexed by [`CasteRole::index`].
    pub caste_counts: [u32; 8],
    pub nest: Position,
    /// Claimed grid cells.
    pub territory: Vec<(u16, u16)>,
    pub fitness: f64,
    /// Shared resource stockpile fed by workers, drained by trade and war.
    pub stockpile: f64,
    pub hive: Option<HiveMind>,
    pub formation: Formation,
    pub founded_tick: u64,
}

/// Diplomatic stance between two colonies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Relation {
    #[default]
    Neutral,
    Friendly,
    Allied,
    Rival,
    Hostile,
    Enemy,
}

/// Declared conflict type, escalating with border pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    Skirmish,
    ResourceWar,
    TotalWar,
    Raid,
}

/// Pairwise diplomatic state, symmetric by key normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diplomacy {
    pub relation: Relation,
    pub trust: f32,
    pub reputation: f32,
}

impl Default for Diplomacy {
    fn default() -> Self {
        Self {
            relation: Relation::Neutral,
            trust: 0.5,
            reputation: 0.5,
        }
    }
}

/// An active conflict between two colonies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub attacker: ColonyId,
    pub defender: ColonyId,
    pub kind: ConflictKind,
    pub declared_tick: u64,
    pub intensity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caste_indices_are_dense() {
        for (i, role) in CasteRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), i);
        }
    }
}
