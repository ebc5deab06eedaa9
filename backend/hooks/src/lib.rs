pub mod builtin;
pub mod evaluator;
pub mod pipeline;
pub mod registry;
pub mod types;

pub use builtin::{BlockListHook, ConditionGate, FnHook, PassThrough, TraceHook};
pub use evaluator::evaluate;
pub use pipeline::HookPipeline;
pub use registry::{EmitHook, HookRegistry};
pub use types::{GateCondition, HookOutcome};
