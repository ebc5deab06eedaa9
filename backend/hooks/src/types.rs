/// Hook outcomes and declarative gate conditions.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use herald_core::Args;

// ---------------------------------------------------------------------------
// Pipeline outcome
// ---------------------------------------------------------------------------

/// Result of running the hook pipeline for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// Fan these arguments out to listeners.
    Emit(Args),
    /// The gate rejected the cycle; nothing is dispatched.
    Suppressed,
}

impl HookOutcome {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, HookOutcome::Suppressed)
    }
}

// ---------------------------------------------------------------------------
// Gate conditions (used by the evaluator)
// ---------------------------------------------------------------------------

/// A structured condition over an argument sequence.
///
/// Fields are dotted paths into the arguments viewed as a JSON array, so
/// `0.kind` is the `kind` field of the first argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum GateCondition {
    FieldEquals { field: String, value: Value },
    FieldContains { field: String, substring: String },
    FieldMatches { field: String, regex: String },
    Exists { field: String },
    And { conditions: Vec<GateCondition> },
    Or { conditions: Vec<GateCondition> },
    Not { condition: Box<GateCondition> },
}
