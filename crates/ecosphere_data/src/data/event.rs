use super::colony::{ColonyId, ConflictKind};
use super::entity::{EntityId, Position, SpeciesId};
use super::plant::PlantId;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EventCategory {
    Entity,
    System,
    Physics,
    Statistical,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

/// Pool that hit its capacity and evicted items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolKind {
    Grains,
    Signals,
    Events,
    SeedBank,
}

/// Structured event payload, tagged for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EventPayload {
    Birth {
        id: EntityId,
        parent_a: Option<EntityId>,
        parent_b: Option<EntityId>,
        generation: u32,
    },
    Death {
        id: EntityId,
        age: u64,
        cause: DeathCause,
    },
    CorpseDecayed {
        id: EntityId,
        nutrients_released: f32,
    },
    Speciation {
        species: SpeciesId,
        parent: Option<SpeciesId>,
        member_count: usize,
    },
    Extinction {
        species: SpeciesId,
        last_population_tick: u64,
    },
    Collision {
        a: EntityId,
        b: EntityId,
        overlap: f64,
    },
    ColonyFounded {
        colony: ColonyId,
        queen: EntityId,
        member_count: usize,
    },
    ColonyDisbanded {
        colony: ColonyId,
    },
    ConflictDeclared {
        attacker: ColonyId,
        defender: ColonyId,
        kind: ConflictKind,
    },
    BattleResolved {
        attacker: ColonyId,
        defender: ColonyId,
        attacker_losses: u32,
        defender_losses: u32,
        territory_transferred: u32,
    },
    AllianceFormed {
        a: ColonyId,
        b: ColonyId,
    },
    TradeExecuted {
        from: ColonyId,
        to: ColonyId,
        amount: f64,
    },
    PressureStarted {
        kind: String,
        severity: f32,
    },
    PressureEnded {
        kind: String,
    },
    CrossPollination {
        source_plant: PlantId,
        target_plant: PlantId,
    },
    Germination {
        plant: PlantId,
    },
    PoolEviction {
        pool: PoolKind,
        dropped: usize,
    },
    EmergentBehavior {
        name: String,
        participants: usize,
    },
    SubsystemError {
        phase: String,
        message: String,
    },
    InvariantViolation {
        message: String,
    },
    MonitorSample {
        shannon: f64,
        simpson: f64,
        richness: usize,
        connectivity: f64,
        health_score: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    OldAge,
    Predation,
    Battle,
    Pressure,
    Fission,
}

/// One entry in the append-only, tick-indexed event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub tick: u64,
    pub category: EventCategory,
    pub severity: Severity,
    pub position: Option<Position>,
    pub payload: EventPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_supports_thresholds() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn payload_serializes_with_tag() {
        let payload = EventPayload::Extinction {
            species: SpeciesId(3),
            last_population_tick: 40,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"event\":\"Extinction\""));
    }
}
