//! OpenAI-compatible Provider - CompletionProvider for `/chat/completions` APIs.
//!
//! Targets OpenRouter by default; any service speaking the OpenAI chat
//! completions format works by changing the base URL.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAICompatibleConfig::new("https://openrouter.ai/api/v1", "meta-llama/llama-3.1-8b-instruct:free")
//!     .with_api_key(api_key);
//!
//! let provider = OpenAICompatibleProvider::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{
    AIError, CompletionProvider, CompletionRequest, CompletionResponse, FinishReason, ProviderInfo,
    TokenUsage,
};

/// Configuration for an OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAICompatibleConfig {
    /// Bearer token; optional for local gateways.
    api_key: Option<Secret<String>>,
    /// Default model when the request carries no hint.
    pub model: String,
    /// Base URL including the version segment (e.g. `.../api/v1`).
    pub base_url: String,
    pub timeout: Duration,
    /// Provider name reported in logs.
    pub name: String,
}

impl OpenAICompatibleConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(60),
            name: "openrouter".to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: Secret<String>) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret().as_str())
    }
}

/// OpenAI-compatible chat completions provider.
pub struct OpenAICompatibleProvider {
    config: OpenAICompatibleConfig,
    client: Client,
}

impl OpenAICompatibleProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    /// Returns `AIError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new(config: OpenAICompatibleConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn to_wire_request(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(ref prompt) = request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: prompt.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|msg| ChatMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }));

        ChatRequest {
            model: request
                .model_hint
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    async fn send_request(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        let mut builder = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .json(&self.to_wire_request(request));
        if let Some(key) = self.config.api_key() {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AIError::timeout(self.config.timeout.as_secs())
            } else if e.is_connect() {
                AIError::network(format!("Connection failed: {}", e))
            } else {
                AIError::network(e.to_string())
            }
        })
    }

    async fn parse_response(&self, response: Response) -> Result<CompletionResponse, AIError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AIError::from_status(status.as_u16(), body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;
        into_completion(chat)
    }
}

fn into_completion(chat: ChatResponse) -> Result<CompletionResponse, AIError> {
    let choice = chat
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AIError::parse("No choices in response"))?;

    let usage = chat
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    Ok(CompletionResponse {
        content: choice.message.content,
        usage,
        model: chat.model,
        finish_reason: FinishReason::from_provider(choice.finish_reason.as_deref()),
    })
}

#[async_trait]
impl CompletionProvider for OpenAICompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.send_request(&request).await?;
        self.parse_response(response).await
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new(&self.config.name, &self.config.model)
    }
}

// ----- Chat Completions API Types -----

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
