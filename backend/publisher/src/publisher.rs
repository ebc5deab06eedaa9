//! Publisher nodes and the hub that builds them.
//!
//! A [`Publisher`] owns one event type on a shared [`EventBus`], the
//! subscriptions made through it, and the records of its open cycles. The
//! "completed"/"failed" children are optional [`Outcomes`] fixed at build
//! time; a publisher built without them cannot track deferred results.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, info};

use herald_config::DispatchConfig;
use herald_core::{HeraldError, Reply};
use herald_hooks::{BlockListHook, EmitHook, HookPipeline, HookRegistry, TraceHook};

use crate::bus::EventBus;
use crate::registry::{self, Subscription, Tracker};
use crate::resolver::{Continuation, Resolver};
use crate::turn::TurnQueue;

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// Shared context of a family of publishers: bus, turn queue and runtime.
#[derive(Clone)]
pub struct Hub {
    bus: Arc<EventBus>,
    turns: TurnQueue,
    runtime: Handle,
    dispatch: DispatchConfig,
}

impl Hub {
    /// Hub on the current tokio runtime with default dispatch settings.
    pub fn new() -> Result<Self, HeraldError> {
        Self::with_config(&DispatchConfig::default())
    }

    /// Hub on the current tokio runtime.
    pub fn with_config(dispatch: &DispatchConfig) -> Result<Self, HeraldError> {
        let runtime = Handle::try_current().map_err(|e| HeraldError::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(runtime, dispatch))
    }

    /// Hub configured from the `dispatch` section of a YAML config file.
    ///
    /// A missing file yields the defaults; an invalid one is rejected.
    pub async fn from_config_file(path: &Path) -> Result<Self, HeraldError> {
        let config = herald_config::load_and_prepare(path)
            .await
            .map_err(|e| HeraldError::ConfigError(format!("{e:#}")))?;
        Self::with_config(&config.dispatch())
    }

    /// Hub configured from `HERALD_CONFIG`, or `./herald.yaml` when unset.
    pub async fn from_default_config() -> Result<Self, HeraldError> {
        Self::from_config_file(&herald_config::config_file_path()).await
    }

    /// Hub bound to an explicit runtime handle.
    pub fn with_handle(runtime: Handle, dispatch: &DispatchConfig) -> Self {
        let turns = TurnQueue::spawn(&runtime);
        info!(
            warn_untracked = dispatch.warn_untracked(),
            blocked_words = dispatch.blocked_words().len(),
            "Herald hub initialized"
        );
        Self {
            bus: Arc::new(EventBus::new()),
            turns,
            runtime,
            dispatch: dispatch.clone(),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn turns(&self) -> &TurnQueue {
        &self.turns
    }

    /// Start building a publisher for `event_type`.
    pub fn publisher(&self, event_type: impl Into<String>) -> PublisherBuilder {
        PublisherBuilder {
            hub: self.clone(),
            event_type: event_type.into(),
            hooks: HookRegistry::new(),
            outcomes: None,
            dispatch: None,
        }
    }

    /// Wait for every cycle queued with `trigger` so far.
    pub async fn flush(&self) -> Result<(), HeraldError> {
        self.turns.flush().await
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("dispatch", &self.dispatch)
            .field("turns_closed", &self.turns.is_closed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// The two child publishers that receive resolved outcomes.
#[derive(Clone)]
pub struct Outcomes {
    pub completed: Publisher,
    pub failed: Publisher,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct PublisherBuilder {
    hub: Hub,
    event_type: String,
    hooks: HookRegistry,
    outcomes: Option<OutcomeSource>,
    dispatch: Option<DispatchConfig>,
}

enum OutcomeSource {
    Given(Outcomes),
    Derived,
}

impl PublisherBuilder {
    /// Append a hook; hooks run in the order they were added.
    pub fn hook(mut self, hook: impl EmitHook + 'static) -> Self {
        self.hooks = self.hooks.with(hook);
        self
    }

    /// Use existing publishers as the completed/failed children.
    pub fn outcomes(mut self, completed: Publisher, failed: Publisher) -> Self {
        self.outcomes = Some(OutcomeSource::Given(Outcomes { completed, failed }));
        self
    }

    /// Create `<event>.completed` and `<event>.failed` children on the same hub.
    pub fn with_children(mut self) -> Self {
        self.outcomes = Some(OutcomeSource::Derived);
        self
    }

    /// Override the hub's dispatch settings for this publisher.
    pub fn config(mut self, dispatch: &DispatchConfig) -> Self {
        self.dispatch = Some(dispatch.clone());
        self
    }

    pub fn build(self) -> Publisher {
        let Self { hub, event_type, hooks, outcomes, dispatch } = self;
        let dispatch = dispatch.unwrap_or_else(|| hub.dispatch.clone());

        let outcomes = outcomes.map(|source| match source {
            OutcomeSource::Given(outcomes) => outcomes,
            OutcomeSource::Derived => Outcomes {
                completed: hub.publisher(format!("{event_type}.completed")).build(),
                failed: hub.publisher(format!("{event_type}.failed")).build(),
            },
        });

        let mut chain = HookRegistry::new();
        if dispatch.trace_cycles() {
            chain = chain.with(TraceHook::new(event_type.clone()));
        }
        if !dispatch.blocked_words().is_empty() {
            chain = chain.with(BlockListHook::new(dispatch.blocked_words().to_vec()));
        }
        let chain = if chain.is_empty() {
            hooks
        } else {
            chain.with(hooks)
        };

        let event_type: Arc<str> = Arc::from(event_type);
        let hooks = if chain.is_empty() {
            HookPipeline::passthrough(Arc::clone(&event_type))
        } else {
            HookPipeline::new(Arc::clone(&event_type), Arc::new(chain))
        };

        let tracker = Arc::new(Tracker::new(
            Arc::clone(&event_type),
            outcomes.is_some(),
            dispatch.warn_untracked(),
            hub.runtime.clone(),
        ));
        let resolver = Resolver::new(Arc::clone(&event_type), outcomes, hub.runtime.clone());

        debug!(
            event_type = %event_type,
            hook = hooks.hook_name(),
            can_handle_promise = tracker.can_track(),
            "publisher built"
        );

        Publisher {
            inner: Arc::new(PublisherInner {
                event_type,
                bus: Arc::clone(&hub.bus),
                turns: hub.turns.clone(),
                hooks,
                tracker,
                resolver,
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

pub(crate) struct PublisherInner {
    pub(crate) event_type: Arc<str>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) turns: TurnQueue,
    pub(crate) hooks: HookPipeline,
    pub(crate) tracker: Arc<Tracker>,
    pub(crate) resolver: Resolver,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Drop for PublisherInner {
    fn drop(&mut self) {
        for sub in self.subscriptions.get_mut().drain(..) {
            sub.unsubscribe();
        }
    }
}

/// A node owning one named event. Clones share the same node.
#[derive(Clone)]
pub struct Publisher {
    pub(crate) inner: Arc<PublisherInner>,
}

impl Publisher {
    pub fn event_type(&self) -> &str {
        &self.inner.event_type
    }

    /// Whether deferred listener results are tracked and forwarded.
    pub fn can_handle_promise(&self) -> bool {
        self.inner.tracker.can_track()
    }

    pub fn outcomes(&self) -> Option<&Outcomes> {
        self.inner.resolver.outcomes()
    }

    pub fn completed(&self) -> Option<&Publisher> {
        self.outcomes().map(|o| &o.completed)
    }

    pub fn failed(&self) -> Option<&Publisher> {
        self.outcomes().map(|o| &o.failed)
    }

    /// Register `callback` for every emission until unsubscribed.
    pub fn listen<F, R>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Value]) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        let sub = registry::listen(
            &self.inner.bus,
            &self.inner.event_type,
            &self.inner.tracker,
            callback,
        );
        self.keep(&sub);
        sub
    }

    /// Register `callback` for the next emission only.
    pub fn listen_once<F, R>(&self, callback: F) -> Subscription
    where
        F: FnOnce(&[Value]) -> R + Send + 'static,
        R: Into<Reply>,
    {
        let sub = registry::listen_once(
            &self.inner.bus,
            &self.inner.event_type,
            &self.inner.tracker,
            callback,
        );
        self.keep(&sub);
        sub
    }

    /// [`listen_once`](Self::listen_once) with an explicit context moved into the call.
    pub fn listen_once_with<C, F, R>(&self, context: C, callback: F) -> Subscription
    where
        C: Send + 'static,
        F: FnOnce(C, &[Value]) -> R + Send + 'static,
        R: Into<Reply>,
    {
        self.listen_once(move |args: &[Value]| callback(context, args))
    }

    /// Live listeners of this publisher's event type, across every
    /// publisher sharing the bus.
    pub fn listener_count(&self) -> usize {
        self.inner.bus.listener_count(&self.inner.event_type)
    }

    /// Cancel every subscription made through this publisher.
    pub fn unsubscribe_all(&self) {
        let subs: Vec<Subscription> = std::mem::take(&mut *self.inner.subscriptions.lock());
        for sub in &subs {
            sub.unsubscribe();
        }
        debug!(event_type = %self.inner.event_type, count = subs.len(), "all listeners unsubscribed");
    }

    /// Forward a value or deferred result to the child publishers.
    pub fn resolve(&self, reply: impl Into<Reply>) -> Continuation {
        self.inner.resolver.resolve(reply.into())
    }

    fn keep(&self, sub: &Subscription) {
        let mut subs = self.inner.subscriptions.lock();
        subs.retain(Subscription::is_active);
        subs.push(sub.clone());
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("event_type", &self.inner.event_type)
            .field("can_handle_promise", &self.can_handle_promise())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
