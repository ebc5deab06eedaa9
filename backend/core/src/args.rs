//! Argument sequences carried by one emission.

use serde_json::Value;

/// Ordered argument sequence handed to every listener of a cycle.
pub type Args = Vec<Value>;

/// True if `value` is already an ordered argument sequence.
pub fn is_ordered_sequence(value: &Value) -> bool {
    value.is_array()
}

/// Turn a pre-emit replacement into an argument list.
///
/// Arrays are used as-is; any other value becomes a one-element sequence.
pub fn normalize(value: Value) -> Args {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}
