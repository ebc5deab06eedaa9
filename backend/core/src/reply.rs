use std::fmt;
use std::future::Future;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;

use crate::error::Rejection;

/// A listener result that settles later.
pub type Deferred = BoxFuture<'static, Result<Value, Rejection>>;

/// What a listener hands back from one invocation.
///
/// Only [`Reply::Deferred`] is tracked by the emission cycle; plain values are
/// accepted and ignored so listeners can return whatever is convenient.
pub enum Reply {
    None,
    Value(Value),
    Deferred(Deferred),
}

impl Reply {
    /// Wrap any `Send` future as a deferred result.
    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Value, Rejection>> + Send + 'static,
    {
        Reply::Deferred(fut.boxed())
    }

    /// A deferred result that is already settled successfully.
    pub fn resolved(value: impl Into<Value>) -> Self {
        Reply::Deferred(future::ready(Ok(value.into())).boxed())
    }

    /// A deferred result that is already settled with a failure.
    pub fn rejected(reason: impl Into<Value>) -> Self {
        Reply::Deferred(future::ready(Err(Rejection::new(reason))).boxed())
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Reply::Deferred(_))
    }

    pub fn into_deferred(self) -> Option<Deferred> {
        match self {
            Reply::Deferred(fut) => Some(fut),
            _ => None,
        }
    }
}

impl Default for Reply {
    fn default() -> Self {
        Reply::None
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::None
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::None => f.write_str("Reply::None"),
            Reply::Value(v) => f.debug_tuple("Reply::Value").field(v).finish(),
            Reply::Deferred(_) => f.write_str("Reply::Deferred(..)"),
        }
    }
}
