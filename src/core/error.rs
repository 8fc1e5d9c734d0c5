// SPDX-License-Identifier: MIT OR Apache-2.0

//! EventFlux Core Error Types
//!
//! Error handling for the partial-match state machine. A pattern step that
//! does not match is a normal outcome and never surfaces here.

use thiserror::Error;

/// Result type for EventFlux operations
pub type EventFluxResult<T> = Result<T, EventFluxError>;

/// EventFlux error types
#[derive(Error, Debug)]
pub enum EventFluxError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        config_key: Option<String>,
    },

    #[error("Failed to parse {format} configuration: {message}")]
    ConfigParse { format: String, message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        field: Option<String>,
    },

    #[error("Contract violation in {component}: {message}")]
    ContractViolation { component: String, message: String },

    #[error("Pool '{pool}' exhausted (capacity {capacity})")]
    PoolExhausted { pool: &'static str, capacity: usize },

    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// Custom error creation helpers
impl EventFluxError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: None,
        }
    }

    /// Create a configuration error with a specific key
    pub fn configuration_with_key(message: impl Into<String>, config_key: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: Some(config_key.into()),
        }
    }

    pub fn config_parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigParse {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation failed error naming the offending field
    pub fn validation_failed_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a contract violation error (caller broke an input contract)
    pub fn contract_violation(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ContractViolation {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn pool_exhausted(pool: &'static str, capacity: usize) -> Self {
        Self::PoolExhausted { pool, capacity }
    }

    /// Create an invariant violation error (internal bookkeeping went wrong)
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Whether this error must terminate the context that raised it.
    ///
    /// Configuration problems are reported before any context runs, so only
    /// runtime failures qualify.
    pub fn is_context_fatal(&self) -> bool {
        matches!(
            self,
            Self::ContractViolation { .. } | Self::PoolExhausted { .. } | Self::InvariantViolation { .. }
        )
    }
}
