//! Adapters - Implementations of port interfaces.
//!
//! - `ai` - Completion providers (Ollama, OpenAI-compatible, mock)
//! - `storage` - Session stores (in-memory)

pub mod ai;
pub mod storage;

pub use ai::{
    MockCompletionProvider, MockError, MockResponse, OllamaConfig, OllamaProvider, OpenAICompatibleConfig,
    OpenAICompatibleProvider,
};
pub use storage::InMemorySessionStore;
