//! Herald runtime configuration schema.
//!
//! Typed for serde YAML deserialization. Every field is optional on disk;
//! [`apply_all_defaults`](crate::apply_all_defaults) fills the gaps.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for Herald.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeraldConfig {
    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Publisher dispatch settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchConfig>,
}

impl HeraldConfig {
    /// Logging section, or its defaults when absent.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Dispatch section, or its defaults when absent.
    pub fn dispatch(&self) -> DispatchConfig {
        self.dispatch.clone().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `herald_publisher=debug,warn`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling NDJSON log file; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Emit JSON on the console instead of the human format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Warn when a deferred result is discarded by a publisher that cannot track it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_untracked: Option<bool>,
    /// Install a block-list gate with these words.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_words: Option<Vec<String>>,
    /// Install a trace hook that debug-logs every cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_cycles: Option<bool>,
}

impl DispatchConfig {
    pub fn warn_untracked(&self) -> bool {
        self.warn_untracked.unwrap_or(true)
    }

    pub fn trace_cycles(&self) -> bool {
        self.trace_cycles.unwrap_or(false)
    }

    pub fn blocked_words(&self) -> &[String] {
        self.blocked_words.as_deref().unwrap_or(&[])
    }
}
