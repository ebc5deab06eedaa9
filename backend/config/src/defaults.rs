//! Config defaults: fills absent sections and fields of a loaded config.

use crate::schema::{DispatchConfig, HeraldConfig, LoggingConfig};

/// Default `EnvFilter` directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: HeraldConfig) -> HeraldConfig {
    let config = apply_logging_defaults(config);
    apply_dispatch_defaults(config)
}

fn apply_logging_defaults(mut config: HeraldConfig) -> HeraldConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.json.is_none() {
        logging.json = Some(false);
    }
    config
}

fn apply_dispatch_defaults(mut config: HeraldConfig) -> HeraldConfig {
    let dispatch = config.dispatch.get_or_insert_with(DispatchConfig::default);
    if dispatch.warn_untracked.is_none() {
        dispatch.warn_untracked = Some(true);
    }
    if dispatch.trace_cycles.is_none() {
        dispatch.trace_cycles = Some(false);
    }
    config
}
