//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types that form the
//! vocabulary of the honeypot domain.

mod confidence;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use confidence::Confidence;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{SenderId, SessionId, TurnSequence, MAX_SESSION_ID_LENGTH};
pub use state_machine::StateMachine;
pub use timestamp::{Timestamp, MAX_UNIX_MILLIS};
