//! Domain layer containing the detection and engagement logic.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `detection` - Lexical signals, semantic judgments and confidence fusion
//! - `intelligence` - Artifact extraction, scoring and deduplication
//! - `engagement` - Session state machine, personas and reply prompts

pub mod detection;
pub mod engagement;
pub mod foundation;
pub mod intelligence;
