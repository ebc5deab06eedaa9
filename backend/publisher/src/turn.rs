//! Turn queue: runs deferred work on a later turn, strictly in submission order.
//!
//! One tokio task drains an unbounded FIFO channel. A panicking turn is
//! logged and the worker keeps going.

use std::panic::{self, AssertUnwindSafe};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use herald_core::HeraldError;

type Turn = Box<dyn FnOnce() + Send + 'static>;

enum Job {
    Run(Turn),
    Flush(oneshot::Sender<()>),
}

/// Handle to the turn worker. Cheap to clone.
#[derive(Clone)]
pub struct TurnQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl TurnQueue {
    /// Spawn the worker on `runtime`.
    pub fn spawn(runtime: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        runtime.spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::Run(turn) => {
                        if let Err(panic_err) = panic::catch_unwind(AssertUnwindSafe(turn)) {
                            error!("turn panicked: {:?}", panic_err);
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("turn queue closed");
        });
        Self { tx }
    }

    /// Queue `turn` behind everything already deferred.
    pub fn defer<F>(&self, turn: F) -> Result<(), HeraldError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx
            .send(Job::Run(Box::new(turn)))
            .map_err(|_| HeraldError::SchedulerClosed("turn worker stopped".into()))
    }

    /// Resolves once every turn deferred before this call has run.
    pub async fn flush(&self) -> Result<(), HeraldError> {
        let (done, wait) = oneshot::channel();
        self.tx
            .send(Job::Flush(done))
            .map_err(|_| HeraldError::SchedulerClosed("turn worker stopped".into()))?;
        wait.await
            .map_err(|_| HeraldError::SchedulerClosed("turn worker dropped flush".into()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
