//! The event bus: a thread-safe, append-only, tick-indexed log with
//! category queries and severity-aware retention.
//!
//! Only the driver thread commits during a tick; parallel phases hand their
//! events back to it, so within-tick order is the commit order and tick
//! values are non-decreasing.

use crate::config::EventConfig;
use ecosphere_data::{Event, EventCategory, EventPayload, Severity};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(from = "Vec<Event>", into = "Vec<Event>")]
pub struct EventBus {
    inner: Mutex<Vec<Event>>,
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            inner: Mutex::new(self.all()),
        }
    }
}

impl From<Vec<Event>> for EventBus {
    fn from(events: Vec<Event>) -> Self {
        Self {
            inner: Mutex::new(events),
        }
    }
}

impl From<EventBus> for Vec<Event> {
    fn from(bus: EventBus) -> Self {
        bus.all()
    }
}

/// Payloads that survive retention pruning regardless of age or severity.
fn always_kept(payload: &EventPayload) -> bool {
    matches!(
        payload,
        EventPayload::Speciation { .. } | EventPayload::Extinction { .. }
    )
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Ticks must be non-decreasing; a violation is a
    /// caller bug surfaced loudly in debug builds and tolerated in release.
    pub fn publish(&self, event: Event) {
        let mut events = self.inner.lock().expect("event bus poisoned");
        debug_assert!(
            events.last().map_or(true, |last| last.tick <= event.tick),
            "event ticks must be non-decreasing"
        );
        events.push(event);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("event bus poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full chronological log (cloned).
    #[must_use]
    pub fn all(&self) -> Vec<Event> {
        self.inner.lock().expect("event bus poisoned").clone()
    }

    /// Chronological slice of events with `from_tick <= tick < to_tick`.
    #[must_use]
    pub fn in_range(&self, from_tick: u64, to_tick: u64) -> Vec<Event> {
        let events = self.inner.lock().expect("event bus poisoned");
        let start = events.partition_point(|e| e.tick < from_tick);
        let end = events.partition_point(|e| e.tick < to_tick);
        events[start..end].to_vec()
    }

    /// Chronological events of one category.
    #[must_use]
    pub fn by_category(&self, category: EventCategory) -> Vec<Event> {
        self.inner
            .lock()
            .expect("event bus poisoned")
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    /// The most recent `n` events, still in chronological order.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<Event> {
        let events = self.inner.lock().expect("event bus poisoned");
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    #[must_use]
    pub fn count_matching<F: Fn(&Event) -> bool>(&self, pred: F) -> usize {
        self.inner
            .lock()
            .expect("event bus poisoned")
            .iter()
            .filter(|e| pred(e))
            .count()
    }

    /// Retention pass: drop events older than `retention_ticks` whose
    /// severity is below the keep threshold. Speciation and extinction
    /// events are always kept. A hard cap bounds the log size regardless.
    /// Returns the number of pruned events.
    pub fn prune(&self, config: &EventConfig, current_tick: u64) -> usize {
        let mut events = self.inner.lock().expect("event bus poisoned");
        let before = events.len();
        let cutoff = current_tick.saturating_sub(config.retention_ticks);

        events.retain(|e| {
            e.tick >= cutoff || e.severity >= config.keep_severity || always_kept(&e.payload)
        });

        if events.len() > config.max_events {
            let overflow = events.len() - config.max_events;
            events.drain(..overflow);
        }
        before - events.len()
    }
}

/// Convenience constructor used throughout the engine.
#[must_use]
pub fn event(
    tick: u64,
    category: EventCategory,
    severity: Severity,
    payload: EventPayload,
) -> Event {
    Event {
        tick,
        category,
        severity,
        position: None,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecosphere_data::{EntityId, SpeciesId};

    fn info_event(tick: u64) -> Event {
        event(
            tick,
            EventCategory::Entity,
            Severity::Info,
            EventPayload::Death {
                id: EntityId(1),
                age: 10,
                cause: ecosphere_data::DeathCause::Starvation,
            },
        )
    }

    #[test]
    fn queries_are_chronological() {
        let bus = EventBus::new();
        for tick in 0..10 {
            bus.publish(info_event(tick));
        }
        let slice = bus.in_range(3, 7);
        assert_eq!(slice.len(), 4);
        assert!(slice.windows(2).all(|w| w[0].tick <= w[1].tick));
        assert_eq!(slice[0].tick, 3);
    }

    #[test]
    fn category_filter_works() {
        let bus = EventBus::new();
        bus.publish(info_event(1));
        bus.publish(event(
            1,
            EventCategory::Statistical,
            Severity::Info,
            EventPayload::MonitorSample {
                shannon: 1.0,
                simpson: 0.5,
                richness: 2,
                connectivity: 0.1,
                health_score: 70.0,
            },
        ));
        assert_eq!(bus.by_category(EventCategory::Entity).len(), 1);
        assert_eq!(bus.by_category(EventCategory::Statistical).len(), 1);
        assert!(bus.by_category(EventCategory::Physics).is_empty());
    }

    #[test]
    fn retention_keeps_speciation_forever() {
        let bus = EventBus::new();
        bus.publish(event(
            0,
            EventCategory::System,
            Severity::Info,
            EventPayload::Speciation {
                species: SpeciesId(1),
                parent: None,
                member_count: 4,
            },
        ));
        bus.publish(info_event(1));

        let config = EventConfig {
            retention_ticks: 10,
            keep_severity: Severity::Warning,
            max_events: 1000,
        };
        let pruned = bus.prune(&config, 1000);
        assert_eq!(pruned, 1);
        let remaining = bus.all();
        assert_eq!(remaining.len(), 1);
        assert!(matches!(
            remaining[0].payload,
            EventPayload::Speciation { .. }
        ));
    }

    #[test]
    fn high_severity_survives_retention() {
        let bus = EventBus::new();
        let mut err = info_event(0);
        err.severity = Severity::Error;
        bus.publish(err);
        bus.publish(info_event(0));

        let config = EventConfig {
            retention_ticks: 10,
            keep_severity: Severity::Warning,
            max_events: 1000,
        };
        bus.prune(&config, 1000);
        assert_eq!(bus.len(), 1);
        assert_eq!(bus.all()[0].severity, Severity::Error);
    }

    #[test]
    fn hard_cap_bounds_the_log() {
        let bus = EventBus::new();
        for tick in 0..100 {
            bus.publish(info_event(tick));
        }
        let config = EventConfig {
            retention_ticks: 1_000_000,
            keep_severity: Severity::Warning,
            max_events: 10,
        };
        bus.prune(&config, 100);
        assert_eq!(bus.len(), 10);
        assert_eq!(bus.all()[0].tick, 90);
    }
}
