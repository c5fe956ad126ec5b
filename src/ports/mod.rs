//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `CompletionProvider` - Text completion (classification, verification, replies)
//! - `SessionStore` - Sessions, turns and artifacts

mod completion;
mod session_store;

pub use completion::{
    AIError, CompletionProvider, CompletionPurpose, CompletionRequest, CompletionResponse,
    FinishReason, Message, MessageRole, ProviderInfo, TokenUsage,
};
pub use session_store::{SessionStore, StoreError};
