//! Cycle Event Logger
//!
//! Structured emission-cycle events (dispatched, suppressed, resolved,
//! discarded) written through `tracing` under the `herald_cycles` target, so
//! the JSON file layer stores them as NDJSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

/// Target used for every cycle event.
pub const CYCLE_TARGET: &str = "herald_cycles";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleEvent {
    Dispatched { invoked: usize, tracked: usize },
    Suppressed,
    Resolved { outcome: String, elapsed_ms: i64 },
    Discarded,
}

#[derive(Debug, Serialize)]
pub struct CycleLogEntry<'a> {
    pub event_type: &'a str,
    pub timestamp: DateTime<Utc>,
    pub event: CycleEvent,
}

pub struct CycleLogger;

impl CycleLogger {
    /// Records one cycle event for `event_type`.
    ///
    /// `Discarded` is logged at WARN, everything else at DEBUG.
    pub fn log_event(event_type: &str, event: CycleEvent) {
        let entry = CycleLogEntry {
            event_type,
            timestamp: Utc::now(),
            event,
        };
        let json = serde_json::to_string(&entry).unwrap_or_default();

        match entry.event {
            CycleEvent::Discarded => warn!(
                target: CYCLE_TARGET,
                event_type,
                entry = %json,
                "deferred result discarded: publisher for '{}' cannot track deferred results",
                event_type
            ),
            _ => debug!(target: CYCLE_TARGET, event_type, entry = %json, "cycle event"),
        }
    }
}
