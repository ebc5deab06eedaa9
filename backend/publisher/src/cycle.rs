//! Emission cycle: hooks, fan-out, collection, resolution.
//!
//! ```text
//! Idle ─► PreEmit ─► ShouldEmit ─┬─► Suppressed
//!                                └─► Fanout ─► Collecting ─► Resolving ─► Idle
//! ```

use std::fmt;

use tracing::{debug, trace};

use herald_core::{Args, HeraldError};
use herald_hooks::HookOutcome;
use herald_logging::{CycleEvent, CycleLogger};

use crate::publisher::Publisher;
use crate::resolver::Continuation;

/// Synchronous report of one `trigger_sync` call.
pub enum Emission {
    /// The gate rejected the arguments; no listener ran.
    Suppressed,
    Dispatched {
        /// Listeners invoked during fan-out.
        invoked: usize,
        /// Deferred results recorded for resolution.
        tracked: usize,
        /// Present when at least one deferred result was tracked.
        resolution: Option<Continuation>,
    },
}

impl Emission {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Emission::Suppressed)
    }

    pub fn invoked(&self) -> usize {
        match self {
            Emission::Suppressed => 0,
            Emission::Dispatched { invoked, .. } => *invoked,
        }
    }

    pub fn tracked(&self) -> usize {
        match self {
            Emission::Suppressed => 0,
            Emission::Dispatched { tracked, .. } => *tracked,
        }
    }

    pub fn into_resolution(self) -> Option<Continuation> {
        match self {
            Emission::Suppressed => None,
            Emission::Dispatched { resolution, .. } => resolution,
        }
    }
}

impl fmt::Debug for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Emission::Suppressed => f.write_str("Suppressed"),
            Emission::Dispatched { invoked, tracked, resolution } => f
                .debug_struct("Dispatched")
                .field("invoked", invoked)
                .field("tracked", tracked)
                .field("resolution", resolution)
                .finish(),
        }
    }
}

impl Publisher {
    /// Run one full cycle on the calling thread.
    pub fn trigger_sync(&self, args: Args) -> Emission {
        let inner = &self.inner;
        let args = match inner.hooks.run(args) {
            HookOutcome::Emit(args) => args,
            HookOutcome::Suppressed => {
                CycleLogger::log_event(&inner.event_type, CycleEvent::Suppressed);
                return Emission::Suppressed;
            }
        };

        trace!(event_type = %inner.event_type, args = args.len(), "fan-out");
        let open = inner.tracker.open();
        inner.bus.emit(&inner.event_type, &args);
        let frame = open.close();

        let invoked = frame.invoked;
        let tracked = frame.records.len();
        CycleLogger::log_event(
            &inner.event_type,
            CycleEvent::Dispatched { invoked, tracked },
        );

        let resolution = inner.resolver.settle(frame.records);
        Emission::Dispatched { invoked, tracked, resolution }
    }

    /// Queue a cycle with `args` behind every cycle already queued.
    pub fn trigger(&self, args: Args) -> Result<(), HeraldError> {
        let this = self.clone();
        debug!(event_type = %self.inner.event_type, "cycle queued");
        self.inner.turns.defer(move || {
            this.trigger_sync(args);
        })
    }

    /// Wait for every cycle queued with `trigger` so far.
    pub async fn flush(&self) -> Result<(), HeraldError> {
        self.inner.turns.flush().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use tokio::sync::oneshot;
    use tracing::Level;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::Registry;

    use herald_config::DispatchConfig;
    use herald_core::{Reply, Resolution};
    use herald_hooks::FnHook;

    use crate::publisher::Hub;

    use super::*;

    type Seen = Arc<Mutex<Vec<Vec<Value>>>>;

    fn record(publisher: &Publisher) -> Seen {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        publisher.listen(move |args: &[Value]| sink.lock().push(args.to_vec()));
        seen
    }

    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn test_single_deferred_forwards_value() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").with_children().build();
        let completed = record(orders.completed().unwrap());
        let failed = record(orders.failed().unwrap());

        orders.listen(|_args: &[Value]| Reply::deferred(async { Ok(json!(5)) }));

        let emission = orders.trigger_sync(vec![json!("go")]);
        assert_eq!(emission.invoked(), 1);
        assert_eq!(emission.tracked(), 1);
        let resolution = emission.into_resolution().unwrap().await;

        assert_eq!(resolution, Resolution::Completed(json!(5)));
        assert_eq!(*completed.lock(), vec![vec![json!(5)]]);
        assert!(failed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_multiple_records_aggregate_in_record_order() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").with_children().build();
        let completed = record(orders.completed().unwrap());

        // The first listener settles last; the aggregate keeps record order.
        let slow = orders.listen(|_args: &[Value]| {
            Reply::deferred(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(json!("slow"))
            })
        });
        let fast = orders.listen(|_args: &[Value]| Reply::resolved("fast"));

        let emission = orders.trigger_sync(vec![]);
        assert_eq!(emission.tracked(), 2);
        emission.into_resolution().unwrap().await;

        let expected = json!([
            {"listener": slow.id().to_string(), "value": "slow"},
            {"listener": fast.id().to_string(), "value": "fast"},
        ]);
        assert_eq!(*completed.lock(), vec![vec![expected]]);
    }

    #[tokio::test]
    async fn test_rejection_goes_to_failed_child() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").with_children().build();
        let completed = record(orders.completed().unwrap());
        let failed = record(orders.failed().unwrap());

        orders.listen(|_args: &[Value]| Reply::resolved(1));
        orders.listen(|_args: &[Value]| Reply::rejected("out of stock"));

        let resolution = orders
            .trigger_sync(vec![])
            .into_resolution()
            .unwrap()
            .await;

        assert!(!resolution.is_completed());
        assert!(completed.lock().is_empty());
        assert_eq!(*failed.lock(), vec![vec![json!("out of stock")]]);
    }

    #[tokio::test]
    async fn test_plain_values_are_not_tracked() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").with_children().build();
        let completed = record(orders.completed().unwrap());

        orders.listen(|_args: &[Value]| json!("plain"));
        orders.listen(|_args: &[Value]| {});

        let emission = orders.trigger_sync(vec![]);
        assert_eq!(emission.invoked(), 2);
        assert_eq!(emission.tracked(), 0);
        assert!(emission.into_resolution().is_none());
        assert!(completed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_untracked_deferred_warns_once_and_still_runs() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").build();
        assert!(!orders.can_handle_promise());
        assert!(orders.completed().is_none());

        let (tx, rx) = oneshot::channel();
        orders.listen_once(move |_args: &[Value]| {
            Reply::deferred(async move {
                let _ = tx.send(());
                Ok(json!(1))
            })
        });

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = Registry::default().with(WarnCounter(Arc::clone(&warnings)));
        let emission = tracing::subscriber::with_default(subscriber, || orders.trigger_sync(vec![]));

        assert_eq!(emission.invoked(), 1);
        assert_eq!(emission.tracked(), 0);
        assert!(emission.into_resolution().is_none());
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        // The discarded work is still driven to completion.
        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_warning_can_be_disabled() {
        let config = DispatchConfig {
            warn_untracked: Some(false),
            ..Default::default()
        };
        let hub = Hub::with_config(&config).unwrap();
        let orders = hub.publisher("orders").build();
        orders.listen(|_args: &[Value]| Reply::resolved(1));

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = Registry::default().with(WarnCounter(Arc::clone(&warnings)));
        tracing::subscriber::with_default(subscriber, || orders.trigger_sync(vec![]));

        assert_eq!(warnings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_gate_suppresses_everything() {
        let hub = Hub::new().unwrap();
        let orders = hub
            .publisher("orders")
            .hook(FnHook::new("closed").gate(|_| false))
            .with_children()
            .build();
        let completed = record(orders.completed().unwrap());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        orders.listen(move |_args: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
            Reply::resolved(1)
        });

        let emission = orders.trigger_sync(vec![json!(1)]);

        assert!(emission.is_suppressed());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        tokio::task::yield_now().await;
        assert!(completed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_pre_emit_replaces_arguments() {
        let hub = Hub::new().unwrap();
        let orders = hub
            .publisher("orders")
            .hook(FnHook::new("total").transform(|args| {
                let total: i64 = args.iter().filter_map(Value::as_i64).sum();
                Some(json!(total))
            }))
            .hook(FnHook::new("positive").gate(|args| args[0].as_i64() > Some(0)))
            .build();
        let seen = record(&orders);

        assert!(!orders.trigger_sync(vec![json!(2), json!(3)]).is_suppressed());
        assert!(orders.trigger_sync(vec![json!(-4)]).is_suppressed());

        assert_eq!(*seen.lock(), vec![vec![json!(5)]]);
    }

    #[tokio::test]
    async fn test_blocked_words_from_config() {
        let config = DispatchConfig {
            blocked_words: Some(vec!["Secret".into()]),
            ..Default::default()
        };
        let hub = Hub::with_config(&config).unwrap();
        let orders = hub.publisher("orders").build();
        let seen = record(&orders);

        assert!(orders.trigger_sync(vec![json!({"note": "top SECRET"})]).is_suppressed());
        assert!(!orders.trigger_sync(vec![json!({"note": "public"})]).is_suppressed());
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_listen_once_and_unsubscribe() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").build();
        let once = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&once);
        orders.listen_once(move |_args: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let gone = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&gone);
        let sub = orders.listen(move |_args: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(orders.listener_count(), 2);

        orders.trigger_sync(vec![]);
        sub.unsubscribe();
        orders.trigger_sync(vec![]);
        orders.trigger_sync(vec![]);

        assert_eq!(once.load(Ordering::SeqCst), 1);
        assert_eq!(gone.load(Ordering::SeqCst), 1);
        assert_eq!(orders.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_listen_once_with_context() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").build();
        let seen = Arc::new(Mutex::new(Vec::new()));
        orders.listen_once_with(Arc::clone(&seen), |sink, args: &[Value]| {
            sink.lock().push(args.to_vec());
        });

        orders.trigger_sync(vec![json!("a")]);
        orders.trigger_sync(vec![json!("b")]);

        assert_eq!(*seen.lock(), vec![vec![json!("a")]]);
    }

    #[tokio::test]
    async fn test_unsubscribe_all_and_drop_detach_from_bus() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").build();
        orders.listen(|_args: &[Value]| {});
        orders.listen(|_args: &[Value]| {});
        assert_eq!(hub.bus().listener_count("orders"), 2);

        orders.unsubscribe_all();
        assert_eq!(orders.listener_count(), 0);
        assert_eq!(hub.bus().listener_count("orders"), 0);

        orders.listen(|_args: &[Value]| {});
        drop(orders);
        assert_eq!(hub.bus().listener_count("orders"), 0);
    }

    #[tokio::test]
    async fn test_trigger_runs_later_in_call_order() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").build();
        let seen = record(&orders);

        for i in 1..=3 {
            orders.trigger(vec![json!(i)]).unwrap();
        }
        assert!(seen.lock().is_empty());

        orders.flush().await.unwrap();
        assert_eq!(*seen.lock(), vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]]);
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_leave_cycle_open() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").with_children().build();
        let completed = record(orders.completed().unwrap());
        orders.listen(|args: &[Value]| Reply::resolved(args[0].clone()));
        orders.listen(|args: &[Value]| {
            if args[0] == json!("boom") {
                panic!("listener failed mid fan-out");
            }
        });

        orders.trigger(vec![json!("boom")]).unwrap();
        orders.flush().await.unwrap();
        assert_eq!(orders.inner.tracker.open_frames(), 0);

        // A deferred result returned outside any cycle still runs.
        let ran = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();
        let counter = Arc::clone(&ran);
        orders.listen_once(move |_args: &[Value]| {
            Reply::deferred(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
                Ok(Value::Null)
            })
        });
        hub.bus().emit("orders", &[json!("direct")]);
        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        // The next cycle resolves only its own record.
        let emission = orders.trigger_sync(vec![json!("next")]);
        assert_eq!(emission.tracked(), 1);
        emission.into_resolution().unwrap().await;
        assert_eq!(completed.lock().last(), Some(&vec![json!("next")]));
    }

    #[tokio::test]
    async fn test_listener_count_covers_event_type() {
        let hub = Hub::new().unwrap();
        let first = hub.publisher("orders").build();
        let second = hub.publisher("orders").build();
        first.listen(|_args: &[Value]| {});
        second.listen(|_args: &[Value]| {});

        assert_eq!(first.listener_count(), 2);
        second.unsubscribe_all();
        assert_eq!(first.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_reentrant_trigger_keeps_cycles_apart() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").with_children().build();
        let completed = record(orders.completed().unwrap());

        let nested: Arc<Mutex<Option<Emission>>> = Arc::new(Mutex::new(None));
        let nested_slot = Arc::clone(&nested);
        let this = orders.clone();
        orders.listen(move |args: &[Value]| {
            if args[0] == json!(1) {
                *nested_slot.lock() = Some(this.trigger_sync(vec![json!(2)]));
            }
            Reply::resolved(args[0].clone())
        });

        let outer = orders.trigger_sync(vec![json!(1)]);
        let inner = nested.lock().take().unwrap();
        assert_eq!(outer.tracked(), 1);
        assert_eq!(inner.tracked(), 1);

        let inner = inner.into_resolution().unwrap().await;
        let outer = outer.into_resolution().unwrap().await;
        assert_eq!(inner, Resolution::Completed(json!(2)));
        assert_eq!(outer, Resolution::Completed(json!(1)));
        assert_eq!(completed.lock().len(), 2);

        // Drops the listener's clone of the publisher.
        orders.unsubscribe_all();
    }

    #[tokio::test]
    async fn test_stale_cycle_does_not_leak_into_next() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").with_children().build();
        let completed = record(orders.completed().unwrap());

        let (release, gate) = oneshot::channel::<()>();
        let gate = Arc::new(Mutex::new(Some(gate)));
        orders.listen(move |args: &[Value]| {
            let value = args[0].clone();
            match gate.lock().take() {
                Some(gate) => Reply::deferred(async move {
                    let _ = gate.await;
                    Ok(value)
                }),
                None => Reply::resolved(value),
            }
        });

        let first = orders.trigger_sync(vec![json!("first")]);
        let second = orders.trigger_sync(vec![json!("second")]);
        assert_eq!(second.tracked(), 1);

        second.into_resolution().unwrap().await;
        assert_eq!(*completed.lock(), vec![vec![json!("second")]]);

        release.send(()).unwrap();
        first.into_resolution().unwrap().await;
        assert_eq!(
            *completed.lock(),
            vec![vec![json!("second")], vec![json!("first")]]
        );
    }

    #[tokio::test]
    async fn test_resolve_plain_value_forwards_immediately() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").with_children().build();
        let completed = record(orders.completed().unwrap());

        let continuation = orders.resolve(json!(7));
        assert!(continuation.is_immediate());
        assert_eq!(*completed.lock(), vec![vec![json!(7)]]);

        orders.resolve(Reply::None);
        assert_eq!(completed.lock()[1], vec![Value::Null]);
        assert_eq!(continuation.await, Resolution::Completed(json!(7)));
    }

    #[tokio::test]
    async fn test_resolve_without_children_only_reports() {
        let hub = Hub::new().unwrap();
        let orders = hub.publisher("orders").build();
        let resolution = orders.resolve(Reply::rejected("nope")).await;
        assert_eq!(resolution.into_result().unwrap_err().reason, json!("nope"));
    }

    #[tokio::test]
    async fn test_explicit_outcomes_are_shared() {
        let hub = Hub::new().unwrap();
        let done = hub.publisher("done").build();
        let broken = hub.publisher("broken").build();
        let completed = record(&done);
        let a = hub.publisher("a").outcomes(done.clone(), broken.clone()).build();
        let b = hub.publisher("b").outcomes(done.clone(), broken).build();
        a.listen(|_args: &[Value]| Reply::resolved("a"));
        b.listen(|_args: &[Value]| Reply::resolved("b"));

        a.trigger_sync(vec![]).into_resolution().unwrap().await;
        b.trigger_sync(vec![]).into_resolution().unwrap().await;

        assert_eq!(*completed.lock(), vec![vec![json!("a")], vec![json!("b")]]);
    }

    #[test]
    fn test_hub_requires_runtime() {
        assert!(matches!(Hub::new(), Err(HeraldError::NoRuntime(_))));
    }
}
