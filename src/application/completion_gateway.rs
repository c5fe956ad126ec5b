//! Completion Gateway - timeout and model fallback around a completion provider.
//!
//! Every completion call made by the application goes through here. A call
//! is tried with the primary model hint; if it fails or times out it is
//! retried once with the fallback hint. Total failure is reported as
//! `CompletionOutcome::Unavailable`, never as an error.
//!
//! # Example
//!
//! ```ignore
//! let gateway = CompletionGateway::new(provider)
//!     .with_timeout(Duration::from_secs(30))
//!     .with_models(Some("llama3.1".into()), Some("mistral".into()));
//!
//! match gateway.complete(request).await {
//!     CompletionOutcome::Completed(response) => { /* use response.content */ }
//!     CompletionOutcome::Unavailable { reason } => { /* degrade */ }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::ports::{AIError, CompletionProvider, CompletionRequest, CompletionResponse};

/// Result of a gateway call.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    Completed(CompletionResponse),
    Unavailable { reason: String },
}

impl CompletionOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, CompletionOutcome::Completed(_))
    }

    /// Generated text, if the call succeeded.
    pub fn content(&self) -> Option<&str> {
        match self {
            CompletionOutcome::Completed(response) => Some(&response.content),
            CompletionOutcome::Unavailable { .. } => None,
        }
    }
}

/// Timeout and fallback wrapper shared by classifier, extraction and synthesis.
pub struct CompletionGateway {
    provider: Arc<dyn CompletionProvider>,
    timeout: Duration,
    primary_model: Option<String>,
    fallback_model: Option<String>,
}

impl CompletionGateway {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(30),
            primary_model: None,
            fallback_model: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the model hints. `None` primary means the provider's default.
    pub fn with_models(mut self, primary: Option<String>, fallback: Option<String>) -> Self {
        self.primary_model = primary;
        self.fallback_model = fallback;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs one request with timeout and at most one fallback attempt.
    pub async fn complete(&self, request: CompletionRequest) -> CompletionOutcome {
        let purpose = request.purpose.as_str();

        let mut primary = request.clone();
        if primary.model_hint.is_none() {
            primary.model_hint = self.primary_model.clone();
        }

        let first_error = match self.attempt(primary).await {
            Ok(response) => return CompletionOutcome::Completed(response),
            Err(err) => err,
        };

        let Some(fallback_model) = self.fallback_model.clone() else {
            warn!(purpose, error = %first_error, "Completion unavailable");
            return CompletionOutcome::Unavailable {
                reason: first_error.to_string(),
            };
        };

        debug!(
            purpose,
            error = %first_error,
            fallback_model = %fallback_model,
            "Retrying completion with fallback model"
        );
        match self.attempt(request.with_model_hint(fallback_model)).await {
            Ok(response) => CompletionOutcome::Completed(response),
            Err(err) => {
                warn!(
                    purpose,
                    primary_error = %first_error,
                    fallback_error = %err,
                    "Completion unavailable after fallback"
                );
                CompletionOutcome::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn attempt(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        match timeout(self.timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(AIError::timeout(self.timeout.as_secs())),
        }
    }
}
