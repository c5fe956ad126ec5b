//! Ollama Provider - CompletionProvider for a local Ollama server.
//!
//! Uses the non-streaming `/api/chat` endpoint. Sampling parameters go in
//! the `options` object (`temperature`, `num_predict`).

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{
    AIError, CompletionProvider, CompletionRequest, CompletionResponse, FinishReason, ProviderInfo,
    TokenUsage,
};

/// Configuration for the Ollama provider.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server address (default: http://localhost:11434).
    pub host: String,
    pub model: String,
    pub timeout: Duration,
}

impl OllamaConfig {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new("http://localhost:11434", "llama3.1")
    }
}

/// Ollama chat provider.
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaProvider {
    /// # Errors
    /// Returns `AIError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new(config: OllamaConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.host.trim_end_matches('/'))
    }

    fn to_wire_request(&self, request: &CompletionRequest) -> OllamaChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(ref prompt) = request.system_prompt {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: prompt.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|msg| OllamaMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }));

        OllamaChatRequest {
            model: request
                .model_hint
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    async fn send_request(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        self.client
            .post(self.chat_url())
            .json(&self.to_wire_request(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::timeout(self.config.timeout.as_secs())
                } else if e.is_connect() {
                    AIError::unavailable(format!("Ollama not reachable: {}", e))
                } else {
                    AIError::network(e.to_string())
                }
            })
    }
}

fn into_completion(chat: OllamaChatResponse) -> CompletionResponse {
    let usage = TokenUsage::new(
        chat.prompt_eval_count.unwrap_or(0),
        chat.eval_count.unwrap_or(0),
    );
    CompletionResponse {
        content: chat.message.map(|m| m.content).unwrap_or_default(),
        usage,
        model: chat.model,
        finish_reason: FinishReason::from_provider(chat.done_reason.as_deref()),
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.send_request(&request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AIError::from_status(status.as_u16(), body));
        }

        let chat: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;
        Ok(into_completion(chat))
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("ollama", &self.config.model)
    }
}

// ----- Ollama API Types -----

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: String,
    message: Option<OllamaMessage>,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CompletionPurpose;

    fn provider() -> OllamaProvider {
        OllamaProvider::new(OllamaConfig::default()).unwrap()
    }

    #[test]
    fn default_config_targets_local_server() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost:11434");
        assert_eq!(config.model, "llama3.1");
    }

    #[test]
    fn chat_url_appends_api_path() {
        assert_eq!(provider().chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn wire_request_disables_streaming_and_maps_options() {
        let request = CompletionRequest::new(CompletionPurpose::Classification)
            .with_system_prompt("classify")
            .with_prompt("message")
            .with_temperature(0.3)
            .with_max_tokens(100);

        let wire = provider().to_wire_request(&request);
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["stream"], false);
        assert_eq!(json["model"], "llama3.1");
        assert_eq!(json["options"]["num_predict"], 100);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn parses_chat_response() {
        let body = r#"{"model":"llama3.1","message":{"role":"assistant","content":"Hello dear"},"done":true,"done_reason":"stop","prompt_eval_count":20,"eval_count":5}"#;
        let chat: OllamaChatResponse = serde_json::from_str(body).unwrap();

        let completion = into_completion(chat);

        assert_eq!(completion.content, "Hello dear");
        assert_eq!(completion.usage.total_tokens, 25);
        assert_eq!(completion.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn missing_message_yields_empty_content() {
        let chat: OllamaChatResponse = serde_json::from_str(r#"{"model":"m"}"#).unwrap();
        assert_eq!(into_completion(chat).content, "");
    }
}
