/// Emit hook trait and ordered hook chains.
///
/// A publisher consults exactly one [`EmitHook`] per cycle. Several hooks can
/// be composed with [`HookRegistry`]; they run sequentially in registration
/// order. The first hook whose gate returns `false` halts the gate chain.
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use herald_core::args;

// ---------------------------------------------------------------------------
// Hook trait
// ---------------------------------------------------------------------------

/// Pre-emission transform and emission gate of one publisher variant.
pub trait EmitHook: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Replace the cycle's arguments. `None` keeps them unchanged.
    ///
    /// An array becomes the new argument list; any other value is wrapped
    /// into a one-element list.
    fn pre_emit(&self, _args: &[Value]) -> Option<Value> {
        None
    }

    /// Decide whether the (possibly transformed) arguments reach listeners.
    fn should_emit(&self, _args: &[Value]) -> bool {
        true
    }
}

impl<H: EmitHook + ?Sized> EmitHook for Arc<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn pre_emit(&self, args: &[Value]) -> Option<Value> {
        (**self).pre_emit(args)
    }

    fn should_emit(&self, args: &[Value]) -> bool {
        (**self).should_emit(args)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

type HookBox = Arc<dyn EmitHook>;

/// Ordered chain of hooks acting as a single [`EmitHook`].
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: Vec<HookBox>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook to the end of the chain.
    pub fn register(&mut self, hook: Arc<dyn EmitHook>) {
        self.hooks.push(hook);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, hook: impl EmitHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl EmitHook for HookRegistry {
    fn name(&self) -> &str {
        "hook_registry"
    }

    /// Each hook sees the arguments produced by the hooks before it.
    fn pre_emit(&self, input: &[Value]) -> Option<Value> {
        let mut current: Option<Vec<Value>> = None;
        for hook in &self.hooks {
            let seen = current.as_deref().unwrap_or(input);
            if let Some(replacement) = hook.pre_emit(seen) {
                debug!("[Hooks] {} rewrote arguments", hook.name());
                current = Some(args::normalize(replacement));
            }
        }
        current.map(Value::Array)
    }

    fn should_emit(&self, args: &[Value]) -> bool {
        for hook in &self.hooks {
            if !hook.should_emit(args) {
                debug!("[Hooks] {} suppressed emission", hook.name());
                return false;
            }
        }
        true
    }
}
