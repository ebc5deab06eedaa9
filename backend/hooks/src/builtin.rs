/// Built-in hook implementations.
///
/// These ship with Herald and can be enabled through configuration or the
/// publisher builder. Each is a concrete struct implementing [`EmitHook`].
use serde_json::Value;
use tracing::debug;

use crate::evaluator;
use crate::registry::EmitHook;
use crate::types::GateCondition;

// ---------------------------------------------------------------------------
// Pass-through: the default hook of every publisher
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl EmitHook for PassThrough {
    fn name(&self) -> &str {
        "pass_through"
    }
}

// ---------------------------------------------------------------------------
// Trace hook: logs every cycle, never transforms
// ---------------------------------------------------------------------------

pub struct TraceHook {
    pub prefix: String,
}

impl TraceHook {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl EmitHook for TraceHook {
    fn name(&self) -> &str {
        "trace_hook"
    }

    fn pre_emit(&self, args: &[Value]) -> Option<Value> {
        debug!("[{}] cycle starting with {} argument(s)", self.prefix, args.len());
        None
    }
}

// ---------------------------------------------------------------------------
// Block-list hook: suppresses cycles carrying a blocked word
// ---------------------------------------------------------------------------

pub struct BlockListHook {
    blocked_words: Vec<String>,
}

impl BlockListHook {
    pub fn new(blocked_words: Vec<String>) -> Self {
        let blocked_words = blocked_words
            .into_iter()
            .map(|w| w.to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { blocked_words }
    }

    fn blocked_in(&self, value: &Value) -> Option<&str> {
        match value {
            Value::String(s) => {
                let lower = s.to_lowercase();
                self.blocked_words
                    .iter()
                    .find(|w| lower.contains(w.as_str()))
                    .map(String::as_str)
            }
            Value::Array(items) => items.iter().find_map(|v| self.blocked_in(v)),
            Value::Object(map) => map.values().find_map(|v| self.blocked_in(v)),
            _ => None,
        }
    }
}

impl EmitHook for BlockListHook {
    fn name(&self) -> &str {
        "block_list_hook"
    }

    fn should_emit(&self, args: &[Value]) -> bool {
        match args.iter().find_map(|v| self.blocked_in(v)) {
            Some(word) => {
                debug!("[BlockList] blocked word detected: {}", word);
                false
            }
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Condition gate: declarative should-emit
// ---------------------------------------------------------------------------

pub struct ConditionGate {
    pub condition: GateCondition,
}

impl ConditionGate {
    pub fn new(condition: GateCondition) -> Self {
        Self { condition }
    }
}

impl EmitHook for ConditionGate {
    fn name(&self) -> &str {
        "condition_gate"
    }

    fn should_emit(&self, args: &[Value]) -> bool {
        evaluator::evaluate(&self.condition, args)
    }
}

// ---------------------------------------------------------------------------
// Closure-backed hook
// ---------------------------------------------------------------------------

type TransformFn = Box<dyn Fn(&[Value]) -> Option<Value> + Send + Sync>;
type GateFn = Box<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Hook assembled from closures, for one-off publisher variants.
pub struct FnHook {
    name: String,
    transform: Option<TransformFn>,
    gate: Option<GateFn>,
}

impl FnHook {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), transform: None, gate: None }
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        self.transform = Some(Box::new(f));
        self
    }

    pub fn gate<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        self.gate = Some(Box::new(f));
        self
    }
}

impl EmitHook for FnHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_emit(&self, args: &[Value]) -> Option<Value> {
        self.transform.as_ref().and_then(|f| f(args))
    }

    fn should_emit(&self, args: &[Value]) -> bool {
        self.gate.as_ref().is_none_or(|f| f(args))
    }
}
