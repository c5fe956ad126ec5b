//! Detection module - scam-confidence scoring.
//!
//! - `lexical` - cheap keyword and structure signals
//! - `semantic` - parsing of model classification replies
//! - `fusion` - weighted combination with historical context

mod category;
mod fusion;
mod lexical;
mod semantic;

pub use category::ScamCategory;
pub use fusion::{
    contextual_score, fuse_scores, provisional_score, ConfidenceFusion, ContextTuning,
    DetectionResult, FusionWeights, LEGITIMATE_CEILING,
};
pub use lexical::{
    saturating_score, LexicalAnalysis, LexicalMatch, LexicalSignal, LexicalSignalExtractor,
    PatternCategory, DEFAULT_SATURATION_RATE,
};
pub use semantic::{parse_classification_reply, SemanticJudgment};
