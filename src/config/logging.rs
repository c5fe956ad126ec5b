//! Logging configuration

use serde::Deserialize;

use super::error::ValidationError;

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Tracing subscriber configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidLogLevel(self.level.clone()));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_is_case_insensitive() {
        let config = LoggingConfig {
            level: "DEBUG".to_string(),
            json: false,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_level_rejected() {
        let config = LoggingConfig {
            level: "verbose".to_string(),
            json: true,
        };
        assert!(config.validate().is_err());
    }
}
