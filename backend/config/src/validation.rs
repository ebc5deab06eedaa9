//! Config validation: field checks with path-qualified messages.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::schema::HeraldConfig;

/// One `EnvFilter` directive: optional `target=` prefix and a level.
static DIRECTIVE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_:\-]*=)?(?i:trace|debug|info|warn|error|off)$")
        .expect("directive pattern is valid")
});

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &HeraldConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_logging(config, &mut report);
    validate_dispatch(config, &mut report);
    report
}

fn validate_logging(config: &HeraldConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if level.trim().is_empty() {
            report.error("logging.level", "Level directive cannot be empty");
        }
        for directive in level.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            if !DIRECTIVE_PATTERN.is_match(directive) {
                report.error(
                    "logging.level",
                    format!("Unrecognized filter directive '{directive}'"),
                );
            }
        }
    }
    if let Some(dir) = &logging.dir {
        if dir.as_os_str().is_empty() {
            report.error("logging.dir", "Log directory cannot be empty");
        }
    }
}

fn validate_dispatch(config: &HeraldConfig, report: &mut ValidationReport) {
    let Some(dispatch) = &config.dispatch else { return };
    for (i, word) in dispatch.blocked_words().iter().enumerate() {
        if word.trim().is_empty() {
            report.warn(
                format!("dispatch.blockedWords[{i}]"),
                "Empty blocked word is ignored",
            );
        }
    }
    if dispatch.warn_untracked == Some(false) {
        report.warn(
            "dispatch.warnUntracked",
            "Discarded deferred results will not be reported",
        );
    }
}
