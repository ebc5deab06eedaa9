//! Telemetry and structured logging components for Herald.
//!
//! Handles subscriber installation, JSON output, file rotation, and
//! structured emission-cycle events.

pub mod cycle_log;
pub mod logger;

pub use cycle_log::{CYCLE_TARGET, CycleEvent, CycleLogEntry, CycleLogger};
pub use logger::{env_filter, init_logger};
