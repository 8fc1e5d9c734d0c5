// SPDX-License-Identifier: MIT OR Apache-2.0

//! # State Runtime Configuration
//!
//! Sizing and logging settings for the partial-match state machine, loadable
//! from TOML or YAML. Every field has a built-in default, so an empty document
//! is a valid configuration.
//!
//! ```toml
//! [pool]
//! state_event_capacity = 2048
//! stream_event_capacity = ${STREAM_POOL:8192}
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Placeholders of the form `${VAR}` or `${VAR:default}` are substituted from
//! the process environment on the raw document before it is parsed, so they
//! can stand in for numbers as well (`state_event_capacity = ${CAP:1024}`).

use crate::core::error::{EventFluxError, EventFluxResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const DEFAULT_STATE_EVENT_CAPACITY: usize = 1024;
pub const DEFAULT_STREAM_EVENT_CAPACITY: usize = 8192;

/// Top-level configuration for a state machine deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateRuntimeConfig {
    pub pool: PoolConfig,
    pub logging: LoggingConfig,
}

/// Bounds for the composite (per-context arena) and flat (shared) event pools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Composite events a single context may hold at once
    pub state_event_capacity: usize,
    /// Flat events outstanding across all contexts sharing the pool
    pub stream_event_capacity: usize,
    /// Allocate every pooled flat event up front instead of on demand
    pub prefill: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            state_event_capacity: DEFAULT_STATE_EVENT_CAPACITY,
            stream_event_capacity: DEFAULT_STREAM_EVENT_CAPACITY,
            prefill: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl StateRuntimeConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> EventFluxResult<Self> {
        let substituted = substitute_env_vars(content)?;
        let config: Self = toml::from_str(&substituted)
            .map_err(|e| EventFluxError::config_parse("toml", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> EventFluxResult<Self> {
        let substituted = substitute_env_vars(content)?;
        // An empty YAML document deserializes to unit, not to an empty map
        let config: Self = if substituted.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&substituted)
                .map_err(|e| EventFluxError::config_parse("yaml", e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, choosing the format from its extension
    pub fn from_file(path: impl AsRef<Path>) -> EventFluxResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            other => Err(EventFluxError::configuration(format!(
                "Unsupported configuration file extension {:?} for '{}'",
                other,
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> EventFluxResult<()> {
        if self.pool.state_event_capacity == 0 {
            return Err(EventFluxError::validation_failed_with_field(
                "state event capacity must be at least 1",
                "pool.state_event_capacity",
            ));
        }
        if self.pool.state_event_capacity > u32::MAX as usize {
            return Err(EventFluxError::validation_failed_with_field(
                format!(
                    "state event capacity {} exceeds the addressable arena size {}",
                    self.pool.state_event_capacity,
                    u32::MAX
                ),
                "pool.state_event_capacity",
            ));
        }
        if self.pool.stream_event_capacity == 0 {
            return Err(EventFluxError::validation_failed_with_field(
                "stream event capacity must be at least 1",
                "pool.stream_event_capacity",
            ));
        }
        Ok(())
    }
}

static ENV_VAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("environment placeholder pattern is valid")
});

/// Substitute `${VAR}` and `${VAR:default}` placeholders from the environment.
///
/// A variable that is unset and has no default is a configuration error; all
/// missing names are reported together.
pub fn substitute_env_vars(value: &str) -> EventFluxResult<String> {
    let mut missing_vars = Vec::new();
    let result = ENV_VAR_REGEX.replace_all(value, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        match env::var(var_name) {
            Ok(env_value) => env_value,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                None => {
                    missing_vars.push(var_name.to_string());
                    String::new()
                }
            },
        }
    });

    if !missing_vars.is_empty() {
        return Err(EventFluxError::configuration_with_key(
            format!(
                "Missing required environment variables: {}",
                missing_vars.join(", ")
            ),
            missing_vars[0].clone(),
        ));
    }

    Ok(result.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StateRuntimeConfig::default();
        assert_eq!(config.pool.state_event_capacity, DEFAULT_STATE_EVENT_CAPACITY);
        assert_eq!(config.pool.stream_event_capacity, DEFAULT_STREAM_EVENT_CAPACITY);
        assert!(!config.pool.prefill);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StateRuntimeConfig::from_toml_str(
            r#"
            [pool]
            state_event_capacity = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.pool.state_event_capacity, 64);
        assert_eq!(config.pool.stream_event_capacity, DEFAULT_STREAM_EVENT_CAPACITY);
    }

    #[test]
    fn test_yaml_level() {
        let config = StateRuntimeConfig::from_yaml_str("logging:\n  level: trace\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert_eq!(config.logging.level.to_level_filter(), log::LevelFilter::Trace);
    }

    #[test]
    fn test_empty_documents() {
        assert_eq!(
            StateRuntimeConfig::from_toml_str("").unwrap(),
            StateRuntimeConfig::default()
        );
        assert_eq!(
            StateRuntimeConfig::from_yaml_str("").unwrap(),
            StateRuntimeConfig::default()
        );
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = StateRuntimeConfig::from_toml_str("[pool]\nstream_event_capacity = 0\n").unwrap_err();
        match err {
            EventFluxError::ValidationFailed { field, .. } => {
                assert_eq!(field.as_deref(), Some("pool.stream_event_capacity"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_toml() {
        let err = StateRuntimeConfig::from_toml_str("[pool\n").unwrap_err();
        assert!(matches!(err, EventFluxError::ConfigParse { ref format, .. } if format == "toml"));
    }

    #[test]
    fn test_default_placeholder_without_env() {
        let out = substitute_env_vars("cap = ${EVENTFLUX_STATE_UNSET_FOR_TEST:42}").unwrap();
        assert_eq!(out, "cap = 42");
    }

    #[test]
    fn test_missing_placeholder_reported() {
        let err = substitute_env_vars("${EVENTFLUX_STATE_MISSING_A} ${EVENTFLUX_STATE_MISSING_B}")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("EVENTFLUX_STATE_MISSING_A"));
        assert!(message.contains("EVENTFLUX_STATE_MISSING_B"));
    }
}
