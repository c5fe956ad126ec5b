//! Turns: immutable records of one message in a session.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Confidence, SessionId, Timestamp, TurnSequence};
use crate::domain::intelligence::Artifact;

/// Direction of a message relative to the honeypot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Sent by the suspected scammer.
    #[serde(alias = "scammer", alias = "sender")]
    Inbound,
    /// Sent by the persona.
    #[serde(alias = "user", alias = "agent", alias = "honeypot")]
    Outbound,
}

impl TurnRole {
    /// Speaker label used in transcripts.
    pub fn speaker(&self) -> &'static str {
        match self {
            TurnRole::Inbound => "Them",
            TurnRole::Outbound => "You",
        }
    }
}

/// A persisted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    session_id: SessionId,
    sequence: TurnSequence,
    role: TurnRole,
    text: String,
    /// Fused scam confidence; set on inbound turns only.
    scam_confidence: Option<Confidence>,
    artifacts: Vec<Artifact>,
    created_at: Timestamp,
}

impl Turn {
    pub fn inbound(
        session_id: SessionId,
        sequence: TurnSequence,
        text: impl Into<String>,
        scam_confidence: Confidence,
        artifacts: Vec<Artifact>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            session_id,
            sequence,
            role: TurnRole::Inbound,
            text: text.into(),
            scam_confidence: Some(scam_confidence),
            artifacts,
            created_at,
        }
    }

    pub fn outbound(
        session_id: SessionId,
        sequence: TurnSequence,
        text: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            session_id,
            sequence,
            role: TurnRole::Outbound,
            text: text.into(),
            scam_confidence: None,
            artifacts: Vec::new(),
            created_at,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn sequence(&self) -> TurnSequence {
        self.sequence
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn is_inbound(&self) -> bool {
        self.role == TurnRole::Inbound
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn scam_confidence(&self) -> Option<Confidence> {
        self.scam_confidence
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }
}

/// A prior message supplied by the caller alongside a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: TurnRole,
    pub text: String,
}

impl HistoryEntry {
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

impl From<&Turn> for HistoryEntry {
    fn from(turn: &Turn) -> Self {
        HistoryEntry::new(turn.role(), turn.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid() -> SessionId {
        SessionId::new("s-1").unwrap()
    }

    #[test]
    fn inbound_turn_carries_confidence() {
        let turn = Turn::inbound(
            sid(),
            TurnSequence::FIRST,
            "hi",
            Confidence::clamped(0.4),
            vec![],
            Timestamp::now(),
        );
        assert!(turn.is_inbound());
        assert_eq!(turn.scam_confidence(), Some(Confidence::clamped(0.4)));
    }

    #[test]
    fn outbound_turn_has_no_confidence() {
        let turn = Turn::outbound(sid(), TurnSequence::new(2), "hello", Timestamp::now());
        assert_eq!(turn.role(), TurnRole::Outbound);
        assert_eq!(turn.scam_confidence(), None);
        assert!(turn.artifacts().is_empty());
    }

    #[test]
    fn role_accepts_caller_aliases() {
        let entry: HistoryEntry =
            serde_json::from_str(r#"{"role":"scammer","text":"pay now"}"#).unwrap();
        assert_eq!(entry.role, TurnRole::Inbound);
        let entry: HistoryEntry = serde_json::from_str(r#"{"role":"user","text":"ok"}"#).unwrap();
        assert_eq!(entry.role, TurnRole::Outbound);
    }

    #[test]
    fn history_entry_from_turn() {
        let turn = Turn::outbound(sid(), TurnSequence::new(2), "hello", Timestamp::now());
        let entry = HistoryEntry::from(&turn);
        assert_eq!(entry, HistoryEntry::new(TurnRole::Outbound, "hello"));
    }
}
