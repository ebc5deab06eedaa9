//! Synchronous Event Bus
//!
//! Keyed by event type. `emit` calls every handler registered for the type at
//! the moment it starts, in registration order, on the caller's thread.
//! The handler table is snapshotted first so handlers may add or remove
//! listeners (or emit again) without deadlocking.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;

use herald_core::ListenerId;

/// A bus-level handler. Publishers wrap user listeners in one of these.
pub type Handler = Arc<dyn Fn(&[Value]) + Send + Sync>;

type HandlerTable = HashMap<String, Vec<(ListenerId, Handler)>>;

#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HandlerTable>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `event_type`, identified by `id`.
    pub fn add_listener(&self, event_type: &str, id: ListenerId, handler: Handler) {
        let mut table = self.handlers.lock();
        table.entry(event_type.to_string()).or_default().push((id, handler));
        trace!(event_type, listener = %id, "handler added");
    }

    /// Remove the handler registered as `id`. Returns `false` if absent.
    pub fn remove_listener(&self, event_type: &str, id: ListenerId) -> bool {
        let mut table = self.handlers.lock();
        let Some(list) = table.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            table.remove(event_type);
        }
        if removed {
            trace!(event_type, listener = %id, "handler removed");
        }
        removed
    }

    /// Fan `args` out to every handler of `event_type`. Returns how many were called.
    pub fn emit(&self, event_type: &str, args: &[Value]) -> usize {
        let snapshot: Vec<Handler> = {
            let table = self.handlers.lock();
            match table.get(event_type) {
                Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return 0,
            }
        };
        for handler in &snapshot {
            handler(args);
        }
        snapshot.len()
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.handlers.lock().get(event_type).map_or(0, Vec::len)
    }
}
