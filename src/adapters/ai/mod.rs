//! Completion Provider Adapters.
//!
//! Implementations of the CompletionProvider port.
//!
//! ## Available Adapters
//!
//! - `MockCompletionProvider` - Scripted mock for testing
//! - `OllamaProvider` - Local Ollama server (`/api/chat`)
//! - `OpenAICompatibleProvider` - OpenRouter and other `/chat/completions` APIs

mod mock_provider;
mod ollama_provider;
mod openai_compatible_provider;

pub use mock_provider::{MockCompletionProvider, MockError, MockResponse};
pub use ollama_provider::{OllamaConfig, OllamaProvider};
pub use openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
