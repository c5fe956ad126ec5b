//! Mock Completion Provider for testing.
//!
//! Scripted implementation of the CompletionProvider port, allowing tests to
//! run without a language model.
//!
//! # Features
//!
//! - Responses consumed in call order
//! - Simulated delays for timeout testing
//! - Error injection for resilience testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockCompletionProvider::new()
//!     .with_response("Category: lottery_prize\nConfidence: 0.95")
//!     .with_error(MockError::Unavailable { message: "down".into() });
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, CompletionProvider, CompletionPurpose, CompletionRequest, CompletionResponse,
    FinishReason, ProviderInfo, TokenUsage,
};

/// Scripted completion provider.
#[derive(Debug, Clone)]
pub struct MockCompletionProvider {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Returned once the script is exhausted.
    fallback: MockResponse,
    info: ProviderInfo,
    /// Simulated latency per request.
    delay: Duration,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Error(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    RateLimited { retry_after_secs: u32 },
    Unavailable { message: String },
    AuthenticationFailed,
    Network { message: String },
    Timeout { timeout_secs: u64 },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => AIError::rate_limited(retry_after_secs),
            MockError::Unavailable { message } => AIError::unavailable(message),
            MockError::AuthenticationFailed => AIError::AuthenticationFailed,
            MockError::Network { message } => AIError::network(message),
            MockError::Timeout { timeout_secs } => AIError::timeout(timeout_secs),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompletionProvider {
    /// Creates a mock that answers "Mock response" once its script runs out.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            fallback: MockResponse::Success("Mock response".to_string()),
            info: ProviderInfo::new("mock", "mock-model-1"),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a mock whose every call fails as unavailable.
    pub fn unavailable() -> Self {
        Self::new().with_exhausted_response(MockResponse::Error(MockError::Unavailable {
            message: "completion service offline".to_string(),
        }))
    }

    /// Adds a successful response to the queue.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        lock(&self.responses).push_back(MockResponse::Success(content.into()));
        self
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: MockError) -> Self {
        lock(&self.responses).push_back(MockResponse::Error(error));
        self
    }

    /// Sets what every call returns once the queue is empty.
    pub fn with_exhausted_response(mut self, response: MockResponse) -> Self {
        self.fallback = response;
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of calls made for one purpose.
    pub fn calls_for(&self, purpose: CompletionPurpose) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.purpose == purpose)
            .count()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let model = request
            .model_hint
            .clone()
            .unwrap_or_else(|| self.info.model.clone());
        lock(&self.calls).push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_response() {
            MockResponse::Success(content) => Ok(CompletionResponse {
                content,
                usage: TokenUsage::new(10, 20),
                model,
                finish_reason: FinishReason::Stop,
            }),
            MockResponse::Error(err) => Err(err.into()),
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request() -> CompletionRequest {
        CompletionRequest::new(CompletionPurpose::Synthesis).with_prompt("Hello")
    }

    #[tokio::test]
    async fn returns_responses_in_order() {
        let provider = MockCompletionProvider::new()
            .with_response("First")
            .with_response("Second");

        let r1 = provider.complete(test_request()).await.unwrap();
        let r2 = provider.complete(test_request()).await.unwrap();

        assert_eq!(r1.content, "First");
        assert_eq!(r2.content, "Second");
        assert_eq!(r1.model, "mock-model-1");
    }

    #[tokio::test]
    async fn returns_default_after_exhausted() {
        let provider = MockCompletionProvider::new().with_response("Only one");

        provider.complete(test_request()).await.unwrap();
        let r2 = provider.complete(test_request()).await.unwrap();

        assert_eq!(r2.content, "Mock response");
    }

    #[tokio::test]
    async fn unavailable_mock_always_fails() {
        let provider = MockCompletionProvider::unavailable();

        for _ in 0..3 {
            let err = provider.complete(test_request()).await.unwrap_err();
            assert!(matches!(err, AIError::Unavailable { .. }));
        }
    }

    #[tokio::test]
    async fn returns_configured_error() {
        let provider =
            MockCompletionProvider::new().with_error(MockError::RateLimited { retry_after_secs: 30 });

        let err = provider.complete(test_request()).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(matches!(err, AIError::RateLimited { retry_after_secs: 30 }));
    }

    #[tokio::test]
    async fn model_hint_is_echoed() {
        let provider = MockCompletionProvider::new().with_response("ok");
        let request = test_request().with_model_hint("mistral");

        let response = provider.complete(request).await.unwrap();

        assert_eq!(response.model, "mistral");
    }

    #[tokio::test]
    async fn tracks_calls_by_purpose() {
        let provider = MockCompletionProvider::new();

        provider.complete(test_request()).await.unwrap();
        provider
            .complete(CompletionRequest::new(CompletionPurpose::Classification).with_prompt("x"))
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.calls_for(CompletionPurpose::Classification), 1);
        assert_eq!(provider.get_calls()[0].purpose, CompletionPurpose::Synthesis);

        provider.clear_calls();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn respects_delay() {
        let provider = MockCompletionProvider::new().with_delay(Duration::from_millis(50));

        let start = std::time::Instant::now();
        provider.complete(test_request()).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn mock_error_converts_to_ai_error() {
        let err: AIError = MockError::AuthenticationFailed.into();
        assert!(matches!(err, AIError::AuthenticationFailed));

        let err: AIError = MockError::Timeout { timeout_secs: 30 }.into();
        assert!(matches!(err, AIError::Timeout { timeout_secs: 30 }));
    }
}
