//! ProcessMessage command handler.
//!
//! Runs one inbound message through detection, the session state machine,
//! extraction and reply synthesis, then commits the turn pair.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::{
    CompletionGateway, ExtractionOutcome, ExtractionPipeline, ResponseSynthesizer,
    SemanticClassifier, SessionLocks, SynthesisSettings, SynthesizedReply,
};
use crate::domain::detection::{
    ConfidenceFusion, ContextTuning, DetectionResult, FusionWeights, LexicalSignalExtractor,
    ScamCategory,
};
use crate::domain::engagement::{
    DetectionState, DetectionThresholds, EngagementLimits, EngagementMode, HistoryEntry, Persona,
    PersonaPolicy, Session, SynthesisContext, TerminationReason, Turn,
};
use crate::domain::foundation::{
    Confidence, DomainError, SenderId, SessionId, Timestamp, TurnSequence, ValidationError,
};
use crate::domain::intelligence::{Artifact, ArtifactSet, ArtifactType, TextSegment};
use crate::ports::{SessionStore, StoreError};

/// Longest inbound message accepted, in bytes.
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

/// Command to process one inbound message.
#[derive(Debug, Clone)]
pub struct ProcessMessageCommand {
    pub session_id: SessionId,
    pub sender_id: SenderId,
    pub text: String,
    pub received_at: Timestamp,
    /// Prior turns supplied by the caller, oldest first. Used only when the
    /// store has no turns for the session yet.
    pub history: Vec<HistoryEntry>,
}

impl ProcessMessageCommand {
    /// Validates the raw request fields.
    pub fn new(
        session_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
        timestamp_millis: i64,
        history: Vec<HistoryEntry>,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::empty_field("message"));
        }
        if text.len() > MAX_MESSAGE_LENGTH {
            return Err(ValidationError::out_of_range(
                "message",
                1,
                MAX_MESSAGE_LENGTH as i64,
                text.len() as i64,
            ));
        }

        Ok(Self {
            session_id: SessionId::new(session_id)?,
            sender_id: SenderId::new(sender_id)?,
            text,
            received_at: Timestamp::from_unix_millis(timestamp_millis)?,
            history,
        })
    }
}

/// Errors that can occur while processing a message.
#[derive(Debug, Error)]
pub enum ProcessMessageError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Layer scores of the current turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub state: DetectionState,
    pub category: ScamCategory,
    pub confidence: Confidence,
    pub lexical: Confidence,
    pub semantic: Option<Confidence>,
    pub contextual: Confidence,
    pub persona: Option<Persona>,
    pub mode: EngagementMode,
    pub termination_reason: Option<TerminationReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngagementMetrics {
    pub turn_count: u32,
    pub engagement_duration_secs: u64,
}

/// Outcome of one processed message.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessMessageResult {
    pub session_id: SessionId,
    pub reply: String,
    pub scam_detected: bool,
    pub agent_active: bool,
    pub detection: DetectionSummary,
    pub metrics: EngagementMetrics,
    /// Every artifact of the session, grouped by type.
    pub intelligence: BTreeMap<ArtifactType, Vec<Artifact>>,
    /// Artifacts inserted or raised by this message.
    pub new_artifacts: Vec<Artifact>,
    pub suspicious_keywords: Vec<String>,
    pub agent_notes: String,
    /// True when any completion call was unavailable.
    pub degraded: bool,
    /// Earliest time the reply should be sent.
    pub responded_at: Timestamp,
}

/// Engine tuning shared by every message.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub thresholds: DetectionThresholds,
    pub weights: FusionWeights,
    pub context: ContextTuning,
    /// Prior turns considered by classification and contextual scoring.
    pub history_window: usize,
    pub policy: PersonaPolicy,
    pub limits: EngagementLimits,
    /// Prior inbound turns re-scanned for artifacts.
    pub extraction_lookback: usize,
    pub semantic_verification: bool,
    /// Transcript entries shown to the reply generator.
    pub transcript_window: usize,
    pub synthesis: SynthesisSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            thresholds: DetectionThresholds::default(),
            weights: FusionWeights::default(),
            context: ContextTuning::default(),
            history_window: 6,
            policy: PersonaPolicy::default(),
            limits: EngagementLimits::default(),
            extraction_lookback: 3,
            semantic_verification: true,
            transcript_window: 10,
            synthesis: SynthesisSettings::default(),
        }
    }
}

/// Everything one message changed, ready to be committed.
struct Staged {
    session: Session,
    inbound: Turn,
    outbound: Turn,
    delta: Vec<Artifact>,
}

/// Handler for inbound messages.
pub struct ProcessMessageHandler {
    store: Arc<dyn SessionStore>,
    lexical: LexicalSignalExtractor,
    classifier: SemanticClassifier,
    fusion: ConfidenceFusion,
    extraction: ExtractionPipeline,
    synthesizer: ResponseSynthesizer,
    locks: SessionLocks,
    settings: EngineSettings,
}

impl ProcessMessageHandler {
    pub fn new(
        store: Arc<dyn SessionStore>,
        gateway: Arc<CompletionGateway>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            lexical: LexicalSignalExtractor::new(),
            classifier: SemanticClassifier::new(Arc::clone(&gateway), settings.history_window),
            fusion: ConfidenceFusion::new(settings.weights, settings.context),
            extraction: ExtractionPipeline::new(
                Arc::clone(&gateway),
                settings.semantic_verification,
            ),
            synthesizer: ResponseSynthesizer::new(gateway, settings.synthesis.clone()),
            locks: SessionLocks::new(),
            settings,
        }
    }

    /// Processes one inbound message.
    ///
    /// Messages for the same session are handled one at a time. Completion
    /// failures degrade the result instead of failing it.
    #[instrument(skip(self, cmd), fields(session_id = %cmd.session_id))]
    pub async fn handle(
        &self,
        cmd: ProcessMessageCommand,
    ) -> Result<ProcessMessageResult, ProcessMessageError> {
        let guard = self.locks.acquire(&cmd.session_id).await;
        let now = cmd.received_at;

        let mut session = match self.store.load_session(&cmd.session_id).await? {
            Some(session) => session,
            None => {
                info!(sender_id = ?cmd.sender_id, "Opening session");
                Session::open(cmd.session_id.clone(), now)
            }
        };
        let stored_turns = self.store.load_turns(&cmd.session_id).await?;
        if session.reconcile(&stored_turns) {
            warn!(
                turn_count = session.turn_count(),
                stored_turns = stored_turns.len(),
                "Session state lagged its turns; reconciled"
            );
        }
        let mut artifacts: ArtifactSet = self
            .store
            .load_artifacts(&cmd.session_id)
            .await?
            .into_iter()
            .collect();

        let history: Vec<HistoryEntry> = if stored_turns.is_empty() {
            cmd.history.clone()
        } else {
            stored_turns.iter().map(HistoryEntry::from).collect()
        };

        if session.is_terminated() {
            // Detection is skipped; the lexical score still annotates the turn.
            let lexical = self.lexical.analyze(&cmd.text);
            let sequence = session.record_inbound(now);
            let reply = self.synthesizer.closing(now);
            let detection = DetectionResult {
                category: session.category().unwrap_or(ScamCategory::Legitimate),
                confidence: lexical.scam_score(),
                lexical: lexical.scam_score(),
                semantic: None,
                contextual: Confidence::ZERO,
            };
            let staged = self.stage(
                session,
                &cmd,
                sequence,
                &detection,
                Vec::new(),
                Vec::new(),
                &reply,
            );
            let session = self.commit(guard, staged).await?;

            return Ok(self.build_result(
                &session,
                &detection,
                &artifacts,
                Vec::new(),
                lexical.suspicious_keywords(),
                &reply,
                false,
                now,
            ));
        }

        let sequence = session.record_inbound(now);
        session.begin_detection()?;

        let (lexical, semantic) = tokio::join!(
            async { self.lexical.analyze(&cmd.text) },
            self.classifier.classify(&cmd.text, &history)
        );

        let prior_confidences: Vec<Confidence> = stored_turns
            .iter()
            .filter_map(Turn::scam_confidence)
            .collect();
        let window_start = prior_confidences
            .len()
            .saturating_sub(self.settings.history_window);
        let detection = self
            .fusion
            .fuse(&lexical, &semantic, &prior_confidences[window_start..]);

        let evaluation = session.evaluate(
            &detection,
            &self.settings.thresholds,
            &self.settings.policy,
            &self.settings.limits,
            now,
        )?;
        if evaluation.previous != evaluation.current {
            info!(
                from = %evaluation.previous,
                to = %evaluation.current,
                confidence = detection.confidence.value(),
                category = %detection.category,
                "Detection state changed"
            );
        }
        if let Some(persona) = evaluation.persona_assigned {
            info!(%persona, category = %detection.category, "Persona assigned");
        }

        let extraction = if session.is_engaged() {
            let segments = self.extraction_segments(&stored_turns, sequence, &cmd.text);
            self.extraction
                .run(&segments, &cmd.text, &mut artifacts)
                .await
        } else {
            ExtractionOutcome::default()
        };

        if let Some(reason) = session.check_termination(
            &artifacts,
            &self.settings.thresholds,
            &self.settings.limits,
            now,
        )? {
            info!(%reason, turn_count = session.turn_count(), "Session terminated");
        }

        let reply = if session.is_terminated() {
            self.synthesizer.closing(now)
        } else if session.is_engaged() {
            let persona = session.active_persona().ok_or_else(|| {
                DomainError::invariant("engaged session has no persona")
                    .with_detail("session_id", session.id().as_str())
            })?;
            let missing = artifacts.missing_types(&self.settings.limits.target_types);
            let transcript_start = history
                .len()
                .saturating_sub(self.settings.transcript_window);
            let recent_outbound: Vec<String> = stored_turns
                .iter()
                .filter(|turn| !turn.is_inbound())
                .map(|turn| turn.text().to_string())
                .collect();
            let ctx = SynthesisContext {
                persona,
                mode: session.mode(),
                turn_count: session.turn_count(),
                missing: &missing,
                transcript: &history[transcript_start..],
                message: &cmd.text,
            };
            self.synthesizer.synthesize(&ctx, &recent_outbound, now).await
        } else {
            self.synthesizer.declined(now)
        };

        let degraded = !semantic.is_available()
            || extraction.verification_unavailable
            || reply.degraded;
        if degraded {
            debug!("Completion capability degraded for this message");
        }

        let turn_artifacts: Vec<Artifact> = extraction
            .observed
            .iter()
            .filter(|artifact| artifact.first_seen == sequence)
            .cloned()
            .collect();
        let staged = self.stage(
            session,
            &cmd,
            sequence,
            &detection,
            turn_artifacts,
            extraction.delta.clone(),
            &reply,
        );
        let session = self.commit(guard, staged).await?;

        Ok(self.build_result(
            &session,
            &detection,
            &artifacts,
            extraction.delta,
            lexical.suspicious_keywords(),
            &reply,
            degraded,
            now,
        ))
    }

    /// The current message plus the last few stored inbound turns.
    fn extraction_segments(
        &self,
        stored_turns: &[Turn],
        sequence: TurnSequence,
        text: &str,
    ) -> Vec<TextSegment> {
        let prior: Vec<&Turn> = stored_turns.iter().filter(|t| t.is_inbound()).collect();
        let start = prior.len().saturating_sub(self.settings.extraction_lookback);

        let mut segments: Vec<TextSegment> = prior[start..]
            .iter()
            .map(|turn| TextSegment::new(turn.sequence(), turn.text()))
            .collect();
        segments.push(TextSegment::new(sequence, text));
        segments
    }

    #[allow(clippy::too_many_arguments)]
    fn stage(
        &self,
        mut session: Session,
        cmd: &ProcessMessageCommand,
        sequence: TurnSequence,
        detection: &DetectionResult,
        turn_artifacts: Vec<Artifact>,
        delta: Vec<Artifact>,
        reply: &SynthesizedReply,
    ) -> Staged {
        let inbound = Turn::inbound(
            cmd.session_id.clone(),
            sequence,
            cmd.text.clone(),
            detection.confidence,
            turn_artifacts,
            cmd.received_at,
        );
        let reply_sequence = session.record_outbound(reply.send_at);
        let outbound = Turn::outbound(
            cmd.session_id.clone(),
            reply_sequence,
            reply.text.clone(),
            reply.send_at,
        );

        Staged {
            session,
            inbound,
            outbound,
            delta,
        }
    }

    /// Persists the staged turn pair in a task that owns the session lock.
    ///
    /// The task runs to completion even if the caller stops waiting.
    async fn commit(
        &self,
        guard: tokio::sync::OwnedMutexGuard<()>,
        staged: Staged,
    ) -> Result<Session, ProcessMessageError> {
        let store = Arc::clone(&self.store);
        let task = tokio::spawn(async move {
            let _guard = guard;
            let session_id = staged.session.id().clone();

            store.append_turn(&staged.inbound).await?;
            for artifact in &staged.delta {
                store.upsert_artifact(&session_id, artifact).await?;
            }
            store.append_turn(&staged.outbound).await?;
            store.save_session_state(&staged.session).await?;

            let inbound_turns = store
                .load_turns(&session_id)
                .await?
                .iter()
                .filter(|turn| turn.is_inbound())
                .count();
            Ok::<_, StoreError>((staged.session, inbound_turns))
        });

        let (session, inbound_turns) = task
            .await
            .map_err(|err| ProcessMessageError::Internal(format!("commit task failed: {err}")))??;

        if let Err(err) = session.verify_invariants(inbound_turns) {
            error!(error = %err, "Session invariant violated");
            return Err(err.into());
        }
        Ok(session)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_result(
        &self,
        session: &Session,
        detection: &DetectionResult,
        artifacts: &ArtifactSet,
        new_artifacts: Vec<Artifact>,
        suspicious_keywords: Vec<String>,
        reply: &SynthesizedReply,
        degraded: bool,
        now: Timestamp,
    ) -> ProcessMessageResult {
        let summary = DetectionSummary {
            state: session.detection_state(),
            category: detection.category,
            confidence: detection.confidence,
            lexical: detection.lexical,
            semantic: detection.semantic,
            contextual: detection.contextual,
            persona: session.active_persona(),
            mode: session.mode(),
            termination_reason: session.termination_reason(),
        };

        ProcessMessageResult {
            session_id: session.id().clone(),
            reply: reply.text.clone(),
            scam_detected: session.was_engaged(),
            agent_active: session.is_engaged(),
            agent_notes: agent_notes(session, &summary, artifacts, &self.settings.limits),
            detection: summary,
            metrics: EngagementMetrics {
                turn_count: session.turn_count(),
                engagement_duration_secs: session.engagement_duration_secs(&now),
            },
            intelligence: artifacts.grouped(),
            new_artifacts,
            suspicious_keywords,
            degraded,
            responded_at: reply.send_at,
        }
    }
}

/// Short analyst-facing summary of the session.
fn agent_notes(
    session: &Session,
    summary: &DetectionSummary,
    artifacts: &ArtifactSet,
    limits: &EngagementLimits,
) -> String {
    if !session.was_engaged() {
        let mut notes = format!(
            "No scam detected (confidence {:.2}); not engaging.",
            summary.confidence.value()
        );
        if let Some(reason) = session.termination_reason() {
            notes.push_str(&format!(" Session closed: {}.", reason));
        }
        return notes;
    }

    let category = session.category().unwrap_or(summary.category);
    let mut notes = format!(
        "Detected {} with peak confidence {:.2}.",
        category,
        session.peak_confidence().value()
    );
    if let Some(persona) = session.active_persona() {
        notes.push_str(&format!(" Engaged as {} ({} mode).", persona, mode_label(session.mode())));
    }
    notes.push_str(&format!(" Collected {} artifact(s)", artifacts.len()));
    let missing = artifacts.missing_types(&limits.target_types);
    if missing.is_empty() {
        notes.push('.');
    } else {
        let names: Vec<&str> = missing.iter().map(ArtifactType::as_str).collect();
        notes.push_str(&format!("; still missing {}.", names.join(", ")));
    }
    if let Some(reason) = session.termination_reason() {
        notes.push_str(&format!(" Session closed: {}.", reason));
    }
    notes
}

fn mode_label(mode: EngagementMode) -> &'static str {
    match mode {
        EngagementMode::RapportBuilding => "rapport building",
        EngagementMode::ExtractionFocused => "extraction focused",
    }
}
