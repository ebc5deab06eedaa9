use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Rejection;

/// Identity of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(pub Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a multi-listener aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerOutcome {
    pub listener: ListenerId,
    pub value: Value,
}

impl ListenerOutcome {
    pub fn new(listener: ListenerId, value: Value) -> Self {
        Self { listener, value }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "listener": self.listener,
            "value": self.value,
        })
    }
}

/// Final outcome forwarded to a child publisher.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Completed(Value),
    Failed(Rejection),
}

impl Resolution {
    pub fn is_completed(&self) -> bool {
        matches!(self, Resolution::Completed(_))
    }

    pub fn into_result(self) -> Result<Value, Rejection> {
        match self {
            Resolution::Completed(v) => Ok(v),
            Resolution::Failed(r) => Err(r),
        }
    }
}

impl From<Result<Value, Rejection>> for Resolution {
    fn from(result: Result<Value, Rejection>) -> Self {
        match result {
            Ok(v) => Resolution::Completed(v),
            Err(r) => Resolution::Failed(r),
        }
    }
}
