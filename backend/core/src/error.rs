use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Top-level error type for the Herald runtime.
#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("turn queue closed: {0}")]
    SchedulerClosed(String),

    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure payload of a deferred listener result.
///
/// The `reason` is what the "failed" child publisher receives as its single
/// trigger argument.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("deferred result rejected: {reason}")]
pub struct Rejection {
    pub reason: Value,
}

impl Rejection {
    pub fn new(reason: impl Into<Value>) -> Self {
        Self { reason: reason.into() }
    }

    /// Rejection carrying an error's display text.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(err.to_string())
    }
}

impl From<anyhow::Error> for Rejection {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

impl From<HeraldError> for Rejection {
    fn from(err: HeraldError) -> Self {
        Self::from_error(&err)
    }
}
