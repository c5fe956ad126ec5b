//! JSON-lines driver.
//!
//! Reads one inbound request per line from stdin and writes one result per
//! line to stdout.
//!
//! ```text
//! {"session_id":"s-1","sender_id":"+919800000000","message":"You won!","timestamp":1700000000000}
//! ```

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

use scam_honeypot::adapters::{
    InMemorySessionStore, OllamaConfig, OllamaProvider, OpenAICompatibleConfig,
    OpenAICompatibleProvider,
};
use scam_honeypot::application::{
    CompletionGateway, ProcessMessageCommand, ProcessMessageHandler, ProcessMessageResult,
};
use scam_honeypot::config::{AiConfig, AiProvider, AppConfig};
use scam_honeypot::domain::engagement::HistoryEntry;
use scam_honeypot::domain::foundation::Timestamp;
use scam_honeypot::ports::{AIError, CompletionProvider};
use scam_honeypot::telemetry;

#[derive(Debug, Deserialize)]
struct InboundRequest {
    session_id: String,
    sender_id: String,
    message: String,
    /// Unix millis; reception time when absent
    timestamp: Option<i64>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OutboundLine {
    Result(Box<ProcessMessageResult>),
    Error {
        session_id: Option<String>,
        error: String,
    },
}

fn build_provider(ai: &AiConfig) -> Result<Arc<dyn CompletionProvider>, AIError> {
    let provider: Arc<dyn CompletionProvider> = match ai.provider {
        AiProvider::Ollama => Arc::new(OllamaProvider::new(
            OllamaConfig::new(&ai.ollama_host, &ai.ollama_model).with_timeout(ai.timeout()),
        )?),
        AiProvider::OpenRouter => {
            let mut config =
                OpenAICompatibleConfig::new(&ai.openrouter_base_url, &ai.openrouter_model)
                    .with_timeout(ai.timeout())
                    .with_name("openrouter");
            if let Some(key) = ai.openrouter_api_key.clone() {
                config = config.with_api_key(key);
            }
            Arc::new(OpenAICompatibleProvider::new(config)?)
        }
    };
    Ok(provider)
}

async fn process_line(handler: &ProcessMessageHandler, line: &str) -> OutboundLine {
    let request: InboundRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            return OutboundLine::Error {
                session_id: None,
                error: format!("malformed request: {err}"),
            }
        }
    };

    let session_id = request.session_id.clone();
    let timestamp = request
        .timestamp
        .unwrap_or_else(|| Timestamp::now().as_unix_millis());
    let command = match ProcessMessageCommand::new(
        request.session_id,
        request.sender_id,
        request.message,
        timestamp,
        request.history,
    ) {
        Ok(command) => command,
        Err(err) => {
            return OutboundLine::Error {
                session_id: Some(session_id),
                error: err.to_string(),
            }
        }
    };

    match handler.handle(command).await {
        Ok(result) => OutboundLine::Result(Box::new(result)),
        Err(err) => {
            error!(session_id = %session_id, error = %err, "Message processing failed");
            OutboundLine::Error {
                session_id: Some(session_id),
                error: err.to_string(),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    telemetry::init_tracing(&config.logging);
    config.validate()?;

    let provider = build_provider(&config.ai)?;
    let info = provider.provider_info();
    let (primary, fallback) = config.ai.models();
    let gateway = CompletionGateway::new(provider)
        .with_timeout(config.ai.timeout())
        .with_models(Some(primary), fallback);
    let handler = ProcessMessageHandler::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(gateway),
        config.engine_settings(),
    );
    info!(provider = %info.name, model = %info.model, "Honeypot ready");

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let mut requests = Box::pin(stream::unfold(lines, |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((line, lines)),
            Ok(None) => None,
            Err(err) => {
                error!(error = %err, "Failed to read stdin");
                None
            }
        }
    }));

    let mut stdout = tokio::io::stdout();
    while let Some(line) = requests.next().await {
        if line.trim().is_empty() {
            continue;
        }
        let outbound = process_line(&handler, &line).await;
        let mut encoded = serde_json::to_string(&outbound)?;
        encoded.push('\n');
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}
