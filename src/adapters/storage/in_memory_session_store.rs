//! In-Memory Session Store Adapter
//!
//! Keeps sessions, turns and artifacts in process memory.
//! Used by the driver binary and by tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::engagement::{Session, Turn};
use crate::domain::foundation::SessionId;
use crate::domain::intelligence::{Artifact, ArtifactSet, UpsertOutcome};
use crate::ports::{SessionStore, StoreError};

/// In-memory storage for sessions
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    turns: Arc<RwLock<HashMap<SessionId, Vec<Turn>>>>,
    artifacts: Arc<RwLock<HashMap<SessionId, ArtifactSet>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of inbound turns stored for a session
    pub async fn inbound_turn_count(&self, id: &SessionId) -> usize {
        self.turns
            .read()
            .await
            .get(id)
            .map_or(0, |turns| turns.iter().filter(|t| t.is_inbound()).count())
    }

    /// Clear all stored data
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
        self.turns.write().await.clear();
        self.artifacts.write().await.clear();
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn save_session_state(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id().clone(), session.clone());
        Ok(())
    }

    async fn append_turn(&self, turn: &Turn) -> Result<(), StoreError> {
        let mut turns = self.turns.write().await;
        let session_turns = turns.entry(turn.session_id().clone()).or_default();
        if session_turns
            .iter()
            .any(|existing| existing.sequence() == turn.sequence())
        {
            return Err(StoreError::DuplicateTurn {
                session_id: turn.session_id().clone(),
                sequence: turn.sequence(),
            });
        }
        session_turns.push(turn.clone());
        session_turns.sort_by_key(Turn::sequence);
        Ok(())
    }

    async fn upsert_artifact(
        &self,
        id: &SessionId,
        artifact: &Artifact,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut artifacts = self.artifacts.write().await;
        Ok(artifacts.entry(id.clone()).or_default().upsert(artifact.clone()))
    }

    async fn load_turns(&self, id: &SessionId) -> Result<Vec<Turn>, StoreError> {
        Ok(self.turns.read().await.get(id).cloned().unwrap_or_default())
    }

    async fn load_artifacts(&self, id: &SessionId) -> Result<Vec<Artifact>, StoreError> {
        Ok(self
            .artifacts
            .read()
            .await
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Confidence, Timestamp, TurnSequence};
    use crate::domain::intelligence::ArtifactType;

    fn session_id() -> SessionId {
        SessionId::new("store-test").unwrap()
    }

    fn handle(confidence: f64, verified: bool) -> Artifact {
        Artifact::new(
            ArtifactType::PaymentHandle,
            "winner@paytm",
            Confidence::clamped(confidence),
            TurnSequence::FIRST,
        )
        .verified(verified)
    }

    #[tokio::test]
    async fn missing_session_loads_as_none() {
        let store = InMemorySessionStore::new();
        assert!(store.load_session(&session_id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_session_round_trips() {
        let store = InMemorySessionStore::new();
        let session = Session::open(session_id(), Timestamp::now());

        store.save_session_state(&session).await.unwrap();

        let loaded = store.load_session(&session_id()).await.unwrap();
        assert_eq!(loaded, Some(session));
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn turns_come_back_in_sequence_order() {
        let store = InMemorySessionStore::new();
        let now = Timestamp::now();
        let second = Turn::outbound(session_id(), TurnSequence::new(2), "reply", now);
        let first = Turn::inbound(session_id(), TurnSequence::new(1), "hello", Confidence::ZERO, vec![], now);

        store.append_turn(&second).await.unwrap();
        store.append_turn(&first).await.unwrap();

        let turns = store.load_turns(&session_id()).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].sequence(), TurnSequence::new(1));
        assert_eq!(store.inbound_turn_count(&session_id()).await, 1);
    }

    #[tokio::test]
    async fn duplicate_sequence_is_rejected() {
        let store = InMemorySessionStore::new();
        let turn = Turn::outbound(session_id(), TurnSequence::new(2), "reply", Timestamp::now());

        store.append_turn(&turn).await.unwrap();
        let result = store.append_turn(&turn).await;

        assert!(matches!(result, Err(StoreError::DuplicateTurn { .. })));
    }

    #[tokio::test]
    async fn upsert_keeps_one_artifact_with_max_confidence() {
        let store = InMemorySessionStore::new();

        let first = store.upsert_artifact(&session_id(), &handle(0.6, true)).await.unwrap();
        let second = store.upsert_artifact(&session_id(), &handle(0.4, false)).await.unwrap();
        let third = store.upsert_artifact(&session_id(), &handle(0.8, false)).await.unwrap();

        assert_eq!(first, UpsertOutcome::Inserted);
        assert_eq!(second, UpsertOutcome::Unchanged);
        assert_eq!(third, UpsertOutcome::Raised);

        let artifacts = store.load_artifacts(&session_id()).await.unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].confidence.value(), 0.8);
        assert!(artifacts[0].verified);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemorySessionStore::new();
        store
            .save_session_state(&Session::open(session_id(), Timestamp::now()))
            .await
            .unwrap();
        store.upsert_artifact(&session_id(), &handle(0.5, false)).await.unwrap();

        store.clear().await;

        assert_eq!(store.session_count().await, 0);
        assert!(store.load_artifacts(&session_id()).await.unwrap().is_empty());
    }
}
