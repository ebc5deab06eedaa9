//! Structured Logger
//!
//! Wraps `tracing` to provide console output (human or JSON), optional
//! NDJSON file rotation, and environment-based level control.

use herald_config::{DEFAULT_LOG_LEVEL, LoggingConfig};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the level filter: `RUST_LOG` wins over the configured directive.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let level = config.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global structured logger.
///
/// Installs a console layer and, when `config.dir` is set, a daily rolling
/// file logger writing NDJSON to `<dir>/herald.log.YYYY-MM-DD`. Returns
/// `false` if a global subscriber was already installed.
pub fn init_logger(config: &LoggingConfig) -> bool {
    let console_layer = if config.json.unwrap_or(false) {
        fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    };

    let file_layer = config.dir.as_ref().map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "herald.log");
        fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_configured_level() {
        let config = LoggingConfig { level: Some("debug".into()), ..Default::default() };
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter(&config).to_string(), "debug");
        }
    }

    #[test]
    fn test_second_init_is_a_no_op() {
        let config = LoggingConfig::default();
        let _ = init_logger(&config);
        assert!(!init_logger(&config));
    }
}
