//! Tracing subscriber setup.

use crate::errors::{PackflowError, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn default_level() -> String {
    "info".to_string()
}

fn default_ansi() -> bool {
    true
}

/// How log output is filtered and rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `packflow=debug`. `RUST_LOG` wins
    /// when set.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit one JSON object per event instead of text.
    #[serde(default)]
    pub json: bool,
    /// Colorize text output.
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            ansi: default_ansi(),
        }
    }
}

impl LoggingConfig {
    /// Sets the filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Enables JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Builds the event filter.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level)
            .map_err(|e| PackflowError::Config(format!("invalid log level '{}': {e}", self.level)))
    }
}

/// Installs the global tracing subscriber, writing to stderr.
///
/// Fails if the filter is invalid or a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = config.env_filter()?;

    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| PackflowError::Config(format!("installing tracing subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LoggingConfig::default());
        assert_eq!(config.level, "info");
        assert!(!config.json);
        assert!(config.ansi);
    }

    #[test]
    fn test_builders() {
        let config = LoggingConfig::default().with_level("packflow=debug").with_json(true);
        assert_eq!(config.level, "packflow=debug");
        assert!(config.json);
    }

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig::default().with_level("packflow=verbose");
        assert!(matches!(config.env_filter(), Err(PackflowError::Config(_))));
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default().with_level("warn");
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
