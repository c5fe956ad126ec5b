//! Configuration error types

use thiserror::Error;

use crate::domain::foundation::ValidationError as DomainValidationError;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid completion timeout")]
    InvalidTimeout,

    #[error("Invalid URL for {0}")]
    InvalidUrl(&'static str),

    #[error("high_confidence_threshold must not be below scam_threshold")]
    ThresholdOrder,

    #[error("min_response_delay_ms exceeds max_response_delay_ms")]
    InvalidDelayRange,

    #[error("Unknown log level: {0}")]
    InvalidLogLevel(String),

    #[error(transparent)]
    Field(#[from] DomainValidationError),
}
