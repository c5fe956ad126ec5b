//! Session Store Port - Interface for persisting sessions, turns and artifacts.
//!
//! Each call is atomic on its own. The application serializes writers per
//! session with `SessionLocks`, so implementations need no cross-call
//! transactions.

use async_trait::async_trait;

use crate::domain::engagement::{Session, Turn};
use crate::domain::foundation::{SessionId, TurnSequence};
use crate::domain::intelligence::{Artifact, UpsertOutcome};

/// Errors that can occur during session storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Turn {sequence} already recorded for session {session_id}")]
    DuplicateTurn {
        session_id: SessionId,
        sequence: TurnSequence,
    },

    #[error("Failed to serialize record: {0}")]
    SerializationFailed(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Port for session persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session, or `None` if no message was seen for the identifier yet.
    async fn load_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Save the session's current state, creating it if needed.
    async fn save_session_state(&self, session: &Session) -> Result<(), StoreError>;

    /// Append an immutable turn.
    ///
    /// # Errors
    /// Returns `StoreError::DuplicateTurn` if the sequence number is taken.
    async fn append_turn(&self, turn: &Turn) -> Result<(), StoreError>;

    /// Insert an artifact or raise the stored one.
    async fn upsert_artifact(
        &self,
        id: &SessionId,
        artifact: &Artifact,
    ) -> Result<UpsertOutcome, StoreError>;

    /// All turns of a session ordered by sequence.
    async fn load_turns(&self, id: &SessionId) -> Result<Vec<Turn>, StoreError>;

    /// All artifacts collected for a session.
    async fn load_artifacts(&self, id: &SessionId) -> Result<Vec<Artifact>, StoreError>;
}
