/// Hook pipeline executor.
///
/// The pipeline is what a publisher calls at the start of every cycle:
/// 1. `pre_emit` may replace the arguments (arrays as-is, scalars wrapped)
/// 2. `should_emit` gates the transformed arguments
/// 3. the caller fans out on `HookOutcome::Emit`, or stops on `Suppressed`
use std::sync::Arc;

use tracing::{debug, trace};

use herald_core::{args, Args};

use crate::builtin::PassThrough;
use crate::registry::EmitHook;
use crate::types::HookOutcome;

/// Wraps the owning publisher's hook with logging and argument normalization.
#[derive(Clone)]
pub struct HookPipeline {
    event_type: Arc<str>,
    hook: Arc<dyn EmitHook>,
}

impl HookPipeline {
    pub fn new(event_type: impl Into<Arc<str>>, hook: Arc<dyn EmitHook>) -> Self {
        Self { event_type: event_type.into(), hook }
    }

    /// Pipeline with the default pass-through hook.
    pub fn passthrough(event_type: impl Into<Arc<str>>) -> Self {
        Self::new(event_type, Arc::new(PassThrough))
    }

    pub fn hook_name(&self) -> &str {
        self.hook.name()
    }

    pub fn run(&self, mut input: Args) -> HookOutcome {
        trace!(event_type = %self.event_type, "[Pipeline] pre_emit");
        if let Some(replacement) = self.hook.pre_emit(&input) {
            input = args::normalize(replacement);
            debug!(
                event_type = %self.event_type,
                hook = self.hook.name(),
                args = input.len(),
                "[Pipeline] arguments transformed"
            );
        }

        trace!(event_type = %self.event_type, "[Pipeline] should_emit");
        if self.hook.should_emit(&input) {
            HookOutcome::Emit(input)
        } else {
            debug!(
                event_type = %self.event_type,
                hook = self.hook.name(),
                "[Pipeline] emission suppressed"
            );
            HookOutcome::Suppressed
        }
    }
}
