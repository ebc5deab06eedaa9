//! Result aggregation and resolution.
//!
//! ```text
//! records of one cycle
//!   ├─ 0 ─► nothing
//!   ├─ 1 ─► resolve(deferred)
//!   └─ n ─► try_join_all([{listener, value}, ...]) ─► resolve(aggregate)
//!
//! resolve(x)
//!   ├─ not deferred ─► completed.trigger_sync([x])            (immediately)
//!   └─ deferred     ─► spawn: Ok(v)  ─► completed.trigger_sync([v])
//!                             Err(e) ─► failed.trigger_sync([e.reason])
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::Utc;
use futures::future::{try_join_all, TryFutureExt};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use herald_core::{ListenerOutcome, Rejection, Reply, Resolution};
use herald_logging::{CycleEvent, CycleLogger};

use crate::publisher::Outcomes;
use crate::registry::DispatchRecord;

// ---------------------------------------------------------------------------
// Continuation
// ---------------------------------------------------------------------------

enum ContinuationState {
    Ready(Option<Resolution>),
    Spawned(JoinHandle<Resolution>),
}

/// The attached continuation chain returned by `resolve`.
///
/// Awaiting it yields the forwarded outcome. Dropping it does not cancel the
/// forwarding; that runs on the runtime regardless.
pub struct Continuation {
    state: ContinuationState,
}

impl Continuation {
    fn ready(resolution: Resolution) -> Self {
        Self { state: ContinuationState::Ready(Some(resolution)) }
    }

    fn spawned(handle: JoinHandle<Resolution>) -> Self {
        Self { state: ContinuationState::Spawned(handle) }
    }

    /// True when the outcome was forwarded synchronously.
    pub fn is_immediate(&self) -> bool {
        matches!(self.state, ContinuationState::Ready(_))
    }
}

impl Future for Continuation {
    type Output = Resolution;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            ContinuationState::Ready(slot) => Poll::Ready(slot.take().unwrap_or_else(|| {
                Resolution::Failed(Rejection::new("continuation polled after completion"))
            })),
            ContinuationState::Spawned(handle) => match Pin::new(handle).poll(cx) {
                Poll::Ready(Ok(resolution)) => Poll::Ready(resolution),
                Poll::Ready(Err(e)) => Poll::Ready(Resolution::Failed(Rejection::new(format!(
                    "continuation aborted: {e}"
                )))),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            ContinuationState::Ready(r) => f.debug_tuple("Continuation::Ready").field(r).finish(),
            ContinuationState::Spawned(_) => f.write_str("Continuation::Spawned(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct Resolver {
    event_type: Arc<str>,
    outcomes: Option<Outcomes>,
    runtime: Handle,
}

impl Resolver {
    pub(crate) fn new(event_type: Arc<str>, outcomes: Option<Outcomes>, runtime: Handle) -> Self {
        Self { event_type, outcomes, runtime }
    }

    pub(crate) fn outcomes(&self) -> Option<&Outcomes> {
        self.outcomes.as_ref()
    }

    /// Normalize one cycle's records into a single forwarded outcome.
    pub(crate) fn settle(&self, records: Vec<DispatchRecord>) -> Option<Continuation> {
        let mut records = records;
        match records.len() {
            0 => None,
            1 => {
                let record = records.pop()?;
                debug!(event_type = %self.event_type, listener = %record.listener, "resolving single record");
                Some(self.resolve_timed(Reply::Deferred(record.deferred), record.recorded_at))
            }
            n => {
                debug!(event_type = %self.event_type, records = n, "resolving aggregate");
                let since = records
                    .iter()
                    .map(|r| r.recorded_at)
                    .min()
                    .unwrap_or_else(Utc::now);
                let mapped = records.into_iter().map(|record| {
                    let listener = record.listener;
                    record
                        .deferred
                        .map_ok(move |value| ListenerOutcome::new(listener, value).to_value())
                });
                let aggregate = try_join_all(mapped).map_ok(Value::Array);
                Some(self.resolve_timed(Reply::deferred(aggregate), since))
            }
        }
    }

    /// Forward a value or deferred result to the child publishers.
    pub(crate) fn resolve(&self, reply: Reply) -> Continuation {
        self.resolve_timed(reply, Utc::now())
    }

    fn resolve_timed(&self, reply: Reply, since: chrono::DateTime<Utc>) -> Continuation {
        match reply {
            Reply::Deferred(deferred) => {
                let this = self.clone();
                let handle = self.runtime.spawn(async move {
                    let resolution = Resolution::from(deferred.await);
                    this.forward(&resolution);
                    CycleLogger::log_event(
                        &this.event_type,
                        CycleEvent::Resolved {
                            outcome: outcome_label(&resolution).to_string(),
                            elapsed_ms: (Utc::now() - since).num_milliseconds(),
                        },
                    );
                    resolution
                });
                Continuation::spawned(handle)
            }
            Reply::Value(value) => self.resolve_now(value),
            Reply::None => self.resolve_now(Value::Null),
        }
    }

    fn resolve_now(&self, value: Value) -> Continuation {
        let resolution = Resolution::Completed(value);
        self.forward(&resolution);
        Continuation::ready(resolution)
    }

    fn forward(&self, resolution: &Resolution) {
        let Some(outcomes) = &self.outcomes else {
            debug!(event_type = %self.event_type, "no child publishers; outcome not forwarded");
            return;
        };
        match resolution {
            Resolution::Completed(value) => {
                outcomes.completed.trigger_sync(vec![value.clone()]);
            }
            Resolution::Failed(rejection) => {
                outcomes.failed.trigger_sync(vec![rejection.reason.clone()]);
            }
        }
    }
}

fn outcome_label(resolution: &Resolution) -> &'static str {
    match resolution {
        Resolution::Completed(_) => "completed",
        Resolution::Failed(_) => "failed",
    }
}
