//! Structured logging bootstrap.
//!
//! Logging goes through the `tracing` ecosystem; this module only provides
//! the subscriber configuration so binaries and examples can opt in with a
//! single call. The `RUST_LOG` environment variable overrides the
//! configured filter when set.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Verbosity threshold of the default filter, ordered from most to least
/// verbose. Converts into [`tracing::Level`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// How events are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One terse line per event; the default for long simulation sweeps.
    #[default]
    Compact,
    /// Multi-line human-readable output.
    Pretty,
    /// Machine-readable JSON, one object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Module filter (e.g. "wavetrace_core=debug"); overrides `level`.
    pub filter: Option<String>,
}

impl LogConfig {
    fn directive(&self) -> String {
        match &self.filter {
            Some(filter) => filter.clone(),
            None => Level::from(self.level).to_string(),
        }
    }
}

/// Installs the global tracing subscriber. Safe to call more than once;
/// later calls are no-ops.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.directive()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    // a subscriber installed by the host application wins
    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_conversion() {
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert!(LogLevel::Trace < LogLevel::Error);
    }

    #[test]
    fn test_directive_prefers_explicit_filter() {
        let mut config = LogConfig::default();
        assert_eq!(config.directive().to_lowercase(), "info");

        config.filter = Some("wavetrace_core=debug".into());
        assert_eq!(config.directive(), "wavetrace_core=debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LogConfig::default();
        init_logging(&config);
        init_logging(&config);
    }
}
