//! Application layer - services and the message handler.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Every completion call goes through the `CompletionGateway`; per-session
//! mutation is serialized by `SessionLocks`.

mod completion_gateway;
mod extraction_pipeline;
mod process_message;
mod response_synthesizer;
mod semantic_classifier;
mod session_locks;

pub use completion_gateway::{CompletionGateway, CompletionOutcome};
pub use extraction_pipeline::{ExtractionOutcome, ExtractionPipeline};
pub use process_message::{
    DetectionSummary, EngagementMetrics, EngineSettings, ProcessMessageCommand,
    ProcessMessageError, ProcessMessageHandler, ProcessMessageResult, MAX_MESSAGE_LENGTH,
};
pub use response_synthesizer::{
    ReplySource, ResponseSynthesizer, SynthesisSettings, SynthesizedReply,
};
pub use semantic_classifier::SemanticClassifier;
pub use session_locks::SessionLocks;
