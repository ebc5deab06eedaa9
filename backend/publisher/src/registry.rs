//! Subscription registry: wraps listeners for the bus and collects the
//! deferred results they return during a cycle.
//!
//! ## Rules
//! - Every wrapper checks its subscription's `aborted` flag right before
//!   calling the listener, so a listener never runs after `unsubscribe`
//!   returns, even from an emit snapshot taken earlier.
//! - A once-listener flips its own flag and detaches from the bus before it
//!   delegates; the callback runs at most once.
//! - Deferred results go to the innermost open cycle frame when the
//!   publisher can track them; otherwise they are run detached and dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, trace};

use herald_core::{Deferred, ListenerId, Reply};
use herald_logging::{CycleEvent, CycleLogger};

use crate::bus::{EventBus, Handler};

// ---------------------------------------------------------------------------
// Dispatch records
// ---------------------------------------------------------------------------

/// A listener paired with the deferred result it returned in one cycle.
pub struct DispatchRecord {
    pub listener: ListenerId,
    pub deferred: Deferred,
    pub recorded_at: DateTime<Utc>,
}

/// Records and invocation count of one open cycle.
#[derive(Default)]
pub struct CycleFrame {
    pub invoked: usize,
    pub records: Vec<DispatchRecord>,
}

/// Per-publisher collector of listener replies.
///
/// Frames form a stack per thread: a listener that re-enters its own
/// publisher opens a fresh frame and cannot see or steal the outer cycle's
/// records, and cycles running on other threads never share a frame. The bus
/// calls listeners on the emitting thread, so the current thread's top frame
/// is always the cycle being dispatched.
pub(crate) struct Tracker {
    event_type: Arc<str>,
    can_track: bool,
    warn_untracked: bool,
    runtime: Handle,
    frames: Mutex<HashMap<ThreadId, Vec<CycleFrame>>>,
}

impl Tracker {
    pub(crate) fn new(
        event_type: Arc<str>,
        can_track: bool,
        warn_untracked: bool,
        runtime: Handle,
    ) -> Self {
        Self {
            event_type,
            can_track,
            warn_untracked,
            runtime,
            frames: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn can_track(&self) -> bool {
        self.can_track
    }

    /// Open an empty frame for a starting cycle.
    ///
    /// The frame is popped when the guard is closed or dropped, so a
    /// listener that unwinds out of fan-out cannot leave it behind.
    pub(crate) fn open(&self) -> FrameGuard<'_> {
        self.frames
            .lock()
            .entry(thread::current().id())
            .or_default()
            .push(CycleFrame::default());
        FrameGuard { tracker: self, closed: false }
    }

    /// Take the innermost frame of the current thread out of the live state.
    fn pop(&self) -> CycleFrame {
        let mut frames = self.frames.lock();
        let id = thread::current().id();
        let Some(stack) = frames.get_mut(&id) else {
            return CycleFrame::default();
        };
        let frame = stack.pop().unwrap_or_default();
        if stack.is_empty() {
            frames.remove(&id);
        }
        frame
    }

    #[cfg(test)]
    pub(crate) fn open_frames(&self) -> usize {
        self.frames.lock().values().map(Vec::len).sum()
    }

    /// Account for one listener invocation and its reply.
    pub(crate) fn accept(&self, listener: ListenerId, reply: Reply) {
        let deferred = {
            let mut frames = self.frames.lock();
            let mut frame = frames
                .get_mut(&thread::current().id())
                .and_then(|stack| stack.last_mut());
            if let Some(frame) = frame.as_deref_mut() {
                frame.invoked += 1;
            }
            let Reply::Deferred(deferred) = reply else {
                return;
            };
            match frame {
                Some(frame) if self.can_track => {
                    trace!(event_type = %self.event_type, %listener, "deferred result tracked");
                    frame.records.push(DispatchRecord {
                        listener,
                        deferred,
                        recorded_at: Utc::now(),
                    });
                    return;
                }
                Some(_) => {
                    if self.warn_untracked {
                        CycleLogger::log_event(&self.event_type, CycleEvent::Discarded);
                    }
                    deferred
                }
                None => {
                    debug!(
                        event_type = %self.event_type,
                        %listener,
                        "deferred result returned outside of a cycle; not tracked"
                    );
                    deferred
                }
            }
        };
        // Untracked work still runs to completion; only its outcome is dropped.
        self.runtime.spawn(deferred.map(|_| ()));
    }
}

/// An open cycle frame on the current thread.
pub(crate) struct FrameGuard<'a> {
    tracker: &'a Tracker,
    closed: bool,
}

impl FrameGuard<'_> {
    /// Close the cycle and hand back what it collected.
    pub(crate) fn close(mut self) -> CycleFrame {
        self.closed = true;
        self.tracker.pop()
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if !self.closed {
            let frame = self.tracker.pop();
            debug!(
                event_type = %self.tracker.event_type,
                records = frame.records.len(),
                "cycle frame dropped without closing"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

struct SubscriptionInner {
    id: ListenerId,
    event_type: Arc<str>,
    aborted: AtomicBool,
    bus: Weak<EventBus>,
}

impl SubscriptionInner {
    /// Set the aborted flag; returns whether it was already set.
    fn abort(&self) -> bool {
        self.aborted.swap(true, Ordering::SeqCst)
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn detach(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove_listener(&self.event_type, self.id);
        }
    }
}

/// Cancellation capability returned by every registration.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.inner.id
    }

    pub fn event_type(&self) -> &str {
        &self.inner.event_type
    }

    pub fn is_active(&self) -> bool {
        !self.inner.is_aborted()
    }

    /// Stop the listener. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        if !self.inner.abort() {
            debug!(event_type = %self.inner.event_type, listener = %self.inner.id, "unsubscribed");
        }
        self.inner.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id)
            .field("event_type", &self.inner.event_type)
            .field("active", &self.is_active())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

fn new_subscription(bus: &Arc<EventBus>, event_type: &Arc<str>) -> Arc<SubscriptionInner> {
    Arc::new(SubscriptionInner {
        id: ListenerId::new(),
        event_type: Arc::clone(event_type),
        aborted: AtomicBool::new(false),
        bus: Arc::downgrade(bus),
    })
}

/// Register a listener invoked on every emission until unsubscribed.
pub(crate) fn listen<F, R>(
    bus: &Arc<EventBus>,
    event_type: &Arc<str>,
    tracker: &Arc<Tracker>,
    callback: F,
) -> Subscription
where
    F: Fn(&[Value]) -> R + Send + Sync + 'static,
    R: Into<Reply>,
{
    let inner = new_subscription(bus, event_type);
    let guard = Arc::clone(&inner);
    let tracker = Arc::clone(tracker);
    let handler: Handler = Arc::new(move |args: &[Value]| {
        if guard.is_aborted() {
            return;
        }
        let reply = callback(args).into();
        tracker.accept(guard.id, reply);
    });
    bus.add_listener(event_type, inner.id, handler);
    Subscription { inner }
}

/// Register a listener that runs at most once.
///
/// The wrapper unsubscribes itself before delegating to `callback`.
pub(crate) fn listen_once<F, R>(
    bus: &Arc<EventBus>,
    event_type: &Arc<str>,
    tracker: &Arc<Tracker>,
    callback: F,
) -> Subscription
where
    F: FnOnce(&[Value]) -> R + Send + 'static,
    R: Into<Reply>,
{
    let inner = new_subscription(bus, event_type);
    let guard = Arc::clone(&inner);
    let tracker = Arc::clone(tracker);
    let slot = Mutex::new(Some(callback));
    let handler: Handler = Arc::new(move |args: &[Value]| {
        if guard.abort() {
            return;
        }
        guard.detach();
        let Some(callback) = slot.lock().take() else {
            return;
        };
        let reply = callback(args).into();
        tracker.accept(guard.id, reply);
    });
    bus.add_listener(event_type, inner.id, handler);
    Subscription { inner }
}
