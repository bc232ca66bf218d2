//! Process-level configuration, read once from the environment at cold start.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "RUST_LOG";
pub const LOG_FORMAT_ENV: &str = "FORGE_LOG_FORMAT";
pub const SEQUENCE_DESCRIPTION_ENV: &str = "FORGE_SEQUENCE_PARAMETER_DESCRIPTION";

pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_SEQUENCE_DESCRIPTION: &str = "Forge Sequence";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            _ => Err(ConfigError::InvalidValue {
                name: LOG_FORMAT_ENV,
                value: raw.to_string(),
                expected: "json or text",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} has unsupported value '{value}' (expected {expected})")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub log_filter: String,
    pub log_format: LogFormat,
    pub sequence_description: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::default(),
            sequence_description: DEFAULT_SEQUENCE_DESCRIPTION.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let log_format = match non_blank(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            log_filter: non_blank(LOG_FILTER_ENV).unwrap_or(defaults.log_filter),
            log_format,
            sequence_description: non_blank(SEQUENCE_DESCRIPTION_ENV)
                .unwrap_or(defaults.sequence_description),
        })
    }
}

/// Installs the global subscriber. CloudWatch captures stderr and stdout
/// alike; ANSI colours are disabled so log lines stay greppable.
pub fn init_logging(config: &RuntimeConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_new(&config.log_filter).map_err(|_| ConfigError::InvalidValue {
        name: LOG_FILTER_ENV,
        value: config.log_filter.clone(),
        expected: "a tracing filter directive",
    })?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false);

    let installed = match config.log_format {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|error| ConfigError::Logging(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[])).expect("config should load");
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[
            (LOG_FILTER_ENV, "debug"),
            (LOG_FORMAT_ENV, "Text"),
            (SEQUENCE_DESCRIPTION_ENV, "Managed by release pipeline"),
        ]))
        .expect("config should load");

        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.sequence_description, "Managed by release pipeline");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[(SEQUENCE_DESCRIPTION_ENV, "  ")]))
            .expect("config should load");
        assert_eq!(config.sequence_description, DEFAULT_SEQUENCE_DESCRIPTION);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let error = RuntimeConfig::from_lookup(lookup_from(&[(LOG_FORMAT_ENV, "xml")]))
            .expect_err("unknown format should fail");
        assert!(error.to_string().contains(LOG_FORMAT_ENV));
    }
}
