//! Completion provider configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Completion provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Which completion service to talk to
    #[serde(default)]
    pub provider: AiProvider,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Ollama base URL
    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,

    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    #[serde(default = "default_ollama_fallback_model")]
    pub ollama_fallback_model: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_openrouter_base_url")]
    pub openrouter_base_url: String,

    #[serde(default = "default_openrouter_model")]
    pub openrouter_model: String,

    #[serde(default = "default_openrouter_fallback_model")]
    pub openrouter_fallback_model: Option<String>,

    /// Bearer token for the OpenAI-compatible API
    pub openrouter_api_key: Option<Secret<String>>,
}

/// Completion service type
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Ollama,
    #[default]
    OpenRouter,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Primary and fallback model hints for the selected provider
    pub fn models(&self) -> (String, Option<String>) {
        match self.provider {
            AiProvider::Ollama => (
                self.ollama_model.clone(),
                self.ollama_fallback_model.clone(),
            ),
            AiProvider::OpenRouter => (
                self.openrouter_model.clone(),
                self.openrouter_fallback_model.clone(),
            ),
        }
    }

    /// Check if an OpenRouter key is configured
    pub fn has_openrouter_key(&self) -> bool {
        self.openrouter_api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }

    /// Validate completion configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err(ValidationError::InvalidTimeout);
        }

        match self.provider {
            AiProvider::Ollama => {
                if !is_http_url(&self.ollama_host) {
                    return Err(ValidationError::InvalidUrl("ollama_host"));
                }
            }
            AiProvider::OpenRouter => {
                if !is_http_url(&self.openrouter_base_url) {
                    return Err(ValidationError::InvalidUrl("openrouter_base_url"));
                }
                if !self.has_openrouter_key() {
                    return Err(ValidationError::MissingRequired(
                        "HONEYPOT__AI__OPENROUTER_API_KEY",
                    ));
                }
            }
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            timeout_secs: default_timeout(),
            ollama_host: default_ollama_host(),
            ollama_model: default_ollama_model(),
            ollama_fallback_model: default_ollama_fallback_model(),
            openrouter_base_url: default_openrouter_base_url(),
            openrouter_model: default_openrouter_model(),
            openrouter_fallback_model: default_openrouter_fallback_model(),
            openrouter_api_key: None,
        }
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1".to_string()
}

fn default_ollama_fallback_model() -> Option<String> {
    Some("mistral".to_string())
}

fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_openrouter_model() -> String {
    "meta-llama/llama-3.1-8b-instruct:free".to_string()
}

fn default_openrouter_fallback_model() -> Option<String> {
    Some("mistralai/mistral-7b-instruct:free".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_config_defaults() {
        let config = AiConfig::default();
        assert_eq!(config.provider, AiProvider::OpenRouter);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.ollama_host, "http://localhost:11434");
    }

    #[test]
    fn test_models_follow_provider() {
        let config = AiConfig {
            provider: AiProvider::Ollama,
            ..Default::default()
        };
        assert_eq!(
            config.models(),
            ("llama3.1".to_string(), Some("mistral".to_string()))
        );
    }

    #[test]
    fn test_validation_openrouter_requires_key() {
        let config = AiConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_validation_ollama_needs_no_key() {
        let config = AiConfig {
            provider: AiProvider::Ollama,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = AiConfig {
            provider: AiProvider::Ollama,
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidTimeout)));
    }

    #[test]
    fn test_validation_valid_openrouter() {
        let config = AiConfig {
            openrouter_api_key: Some(Secret::new("sk-or-xxx".to_string())),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
