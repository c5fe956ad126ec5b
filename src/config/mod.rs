//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `HONEYPOT` prefix and nested values use double underscores as separators.
//! Every section has defaults, so an empty environment yields a working
//! configuration apart from provider credentials.
//!
//! # Example
//!
//! ```no_run
//! use scam_honeypot::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Engaging at confidence {}", config.detection.scam_threshold);
//! ```

mod ai;
mod detection;
mod engagement;
mod error;
mod logging;

pub use ai::{AiConfig, AiProvider};
pub use detection::DetectionConfig;
pub use engagement::{EngagementConfig, ExtractionConfig, SynthesisConfig};
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;

use serde::Deserialize;

use crate::application::EngineSettings;
use crate::domain::engagement::PersonaPolicy;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Thresholds, fusion weights and history window
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Turn and time budget
    #[serde(default)]
    pub engagement: EngagementConfig,

    /// Artifact extraction knobs
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Reply timing and consistency knobs
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Completion provider (Ollama/OpenRouter)
    #[serde(default)]
    pub ai: AiConfig,

    /// Tracing output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `HONEYPOT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `HONEYPOT__DETECTION__SCAM_THRESHOLD=0.75` -> `detection.scam_threshold = 0.75`
    /// - `HONEYPOT__AI__PROVIDER=ollama` -> `ai.provider = Ollama`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("HONEYPOT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.detection.validate()?;
        self.engagement.validate()?;
        self.extraction.validate()?;
        self.synthesis.validate()?;
        self.ai.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Engine tuning derived from the detection, engagement, extraction and
    /// synthesis sections
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            thresholds: self.detection.thresholds(),
            weights: self.detection.weights,
            context: self.detection.context,
            history_window: self.detection.history_window,
            policy: PersonaPolicy::default(),
            limits: self.engagement.limits(),
            extraction_lookback: self.extraction.lookback_turns,
            semantic_verification: self.extraction.semantic_verification,
            transcript_window: self.synthesis.transcript_window,
            synthesis: self.synthesis.settings(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "HONEYPOT__DETECTION__SCAM_THRESHOLD",
        "HONEYPOT__DETECTION__WEIGHTS__SEMANTIC",
        "HONEYPOT__ENGAGEMENT__MAX_TURNS",
        "HONEYPOT__AI__PROVIDER",
        "HONEYPOT__AI__OPENROUTER_API_KEY",
        "HONEYPOT__EXTRACTION__SEMANTIC_VERIFICATION",
        "HONEYPOT__LOGGING__JSON",
    ];

    /// Helper to clear environment variables after testing
    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_defaults_from_empty_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.detection.scam_threshold, 0.7);
        assert_eq!(config.engagement.max_turns, 20);
        assert_eq!(config.ai.provider, AiProvider::OpenRouter);
    }

    #[test]
    fn test_nested_values_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("HONEYPOT__DETECTION__SCAM_THRESHOLD", "0.75");
        env::set_var("HONEYPOT__DETECTION__WEIGHTS__SEMANTIC", "0.5");
        env::set_var("HONEYPOT__ENGAGEMENT__MAX_TURNS", "12");
        env::set_var("HONEYPOT__AI__PROVIDER", "ollama");
        env::set_var("HONEYPOT__EXTRACTION__SEMANTIC_VERIFICATION", "false");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.detection.scam_threshold, 0.75);
        assert_eq!(config.detection.weights.semantic, 0.5);
        assert_eq!(config.detection.weights.lexical, 0.3);
        assert_eq!(config.engagement.max_turns, 12);
        assert_eq!(config.ai.provider, AiProvider::Ollama);
        assert!(!config.extraction.semantic_verification);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_openrouter_key_is_required() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_validate_with_openrouter_key() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("HONEYPOT__AI__OPENROUTER_API_KEY", "sk-or-test");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_settings_follow_sections() {
        let config = AppConfig::default();
        let settings = config.engine_settings();

        assert_eq!(settings.history_window, 6);
        assert_eq!(settings.extraction_lookback, 3);
        assert_eq!(settings.limits.max_turns, 20);
        assert_eq!(settings.synthesis.min_response_delay_ms, 1000);
    }
}
