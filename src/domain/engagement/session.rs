//! Session aggregate.
//!
//! The session owns the detection lifecycle of one conversation: whether the
//! sender was judged a scammer, which persona answers, and how much of the
//! turn and time budget is left.
//!
//! # Invariants
//!
//! - `turn_count` equals the number of inbound turns recorded
//! - `active_persona` is set at most once, on the first move into `Engaged`
//! - nothing leaves `Terminated`

use serde::{Deserialize, Serialize};

use super::{DetectionState, EngagementMode, Persona, PersonaPolicy, TerminationReason, Turn};
use crate::domain::detection::{DetectionResult, ScamCategory};
use crate::domain::foundation::{
    Confidence, DomainError, ErrorCode, SessionId, StateMachine, Timestamp, TurnSequence,
    ValidationError,
};
use crate::domain::intelligence::{ArtifactSet, ArtifactType};

/// Score thresholds that drive transitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionThresholds {
    /// Engage at or above this fused confidence.
    pub scam_threshold: f64,
    /// Extraction-focused mode and artifact completeness.
    pub high_confidence_threshold: f64,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            scam_threshold: 0.7,
            high_confidence_threshold: 0.9,
        }
    }
}

/// Longest accepted engagement time budget (one week).
pub const MAX_TIME_BUDGET_SECS: u64 = 7 * 24 * 60 * 60;

/// Turn and time budget of an engagement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementLimits {
    pub max_turns: u32,
    pub time_budget_secs: u64,
    pub min_turns_before_completion: u32,
    /// Artifact types that must all be collected for completion.
    pub target_types: Vec<ArtifactType>,
}

impl Default for EngagementLimits {
    fn default() -> Self {
        Self {
            max_turns: 20,
            time_budget_secs: 1800,
            min_turns_before_completion: 5,
            target_types: ArtifactType::all().to_vec(),
        }
    }
}

/// What one evaluation did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub previous: DetectionState,
    pub current: DetectionState,
    /// Set only on the turn that assigned the persona.
    pub persona_assigned: Option<Persona>,
}

impl Evaluation {
    pub fn newly_engaged(&self) -> bool {
        self.persona_assigned.is_some()
    }
}

/// Per-conversation detection and engagement state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    created_at: Timestamp,
    last_activity_at: Timestamp,
    detection_state: DetectionState,
    active_persona: Option<Persona>,
    turn_count: u32,
    engaged_at: Option<Timestamp>,
    engagement_deadline: Option<Timestamp>,
    /// Category that triggered engagement.
    category: Option<ScamCategory>,
    peak_confidence: Confidence,
    mode: EngagementMode,
    termination_reason: Option<TerminationReason>,
    next_sequence: TurnSequence,
}

impl Session {
    /// Opens a session for a first message received at `now`.
    pub fn open(id: SessionId, now: Timestamp) -> Self {
        Self {
            id,
            created_at: now,
            last_activity_at: now,
            detection_state: DetectionState::New,
            active_persona: None,
            turn_count: 0,
            engaged_at: None,
            engagement_deadline: None,
            category: None,
            peak_confidence: Confidence::ZERO,
            mode: EngagementMode::default(),
            termination_reason: None,
            next_sequence: TurnSequence::FIRST,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn last_activity_at(&self) -> &Timestamp {
        &self.last_activity_at
    }

    pub fn detection_state(&self) -> DetectionState {
        self.detection_state
    }

    pub fn active_persona(&self) -> Option<Persona> {
        self.active_persona
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn engaged_at(&self) -> Option<&Timestamp> {
        self.engaged_at.as_ref()
    }

    pub fn engagement_deadline(&self) -> Option<&Timestamp> {
        self.engagement_deadline.as_ref()
    }

    pub fn category(&self) -> Option<ScamCategory> {
        self.category
    }

    pub fn peak_confidence(&self) -> Confidence {
        self.peak_confidence
    }

    pub fn mode(&self) -> EngagementMode {
        self.mode
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.termination_reason
    }

    pub fn is_engaged(&self) -> bool {
        self.detection_state.is_engaged()
    }

    pub fn is_terminated(&self) -> bool {
        self.detection_state == DetectionState::Terminated
    }

    /// True once the session has ever engaged, including after termination.
    pub fn was_engaged(&self) -> bool {
        self.engaged_at.is_some()
    }

    /// Seconds since engagement started, or zero if it never did.
    pub fn engagement_duration_secs(&self, now: &Timestamp) -> u64 {
        self.engaged_at.map_or(0, |start| now.secs_since(&start))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Turn bookkeeping
    // ─────────────────────────────────────────────────────────────────────────

    /// Counts an inbound message and allocates its sequence number.
    pub fn record_inbound(&mut self, at: Timestamp) -> TurnSequence {
        self.turn_count += 1;
        self.touch(at);
        self.allocate_sequence()
    }

    /// Allocates the sequence number of a reply.
    pub fn record_outbound(&mut self, at: Timestamp) -> TurnSequence {
        self.touch(at);
        self.allocate_sequence()
    }

    fn touch(&mut self, at: Timestamp) {
        self.last_activity_at = self.last_activity_at.max(at);
    }

    fn allocate_sequence(&mut self) -> TurnSequence {
        let sequence = self.next_sequence;
        self.next_sequence = sequence.next();
        sequence
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Prepares the session to score a new inbound turn.
    ///
    /// `New` and `Declined` move to `Detecting`; an engaged session stays
    /// engaged.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if the session is terminated
    pub fn begin_detection(&mut self) -> Result<(), DomainError> {
        match self.detection_state {
            DetectionState::New | DetectionState::Declined => {
                self.detection_state = self
                    .detection_state
                    .transition_to(DetectionState::Detecting)?;
                Ok(())
            }
            DetectionState::Detecting | DetectionState::Engaged => Ok(()),
            DetectionState::Terminated => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Terminated session cannot score new turns",
            )
            .with_detail("session_id", self.id.as_str())),
        }
    }

    /// Applies the fused detection result of the current turn.
    ///
    /// A detecting session engages at or above the scam threshold and
    /// declines below it. An engaged session stays engaged regardless of the
    /// score; only budgets and completion end it.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless the session is detecting or engaged
    /// - `PersonaAlreadyAssigned` if engagement would replace the persona
    pub fn evaluate(
        &mut self,
        detection: &DetectionResult,
        thresholds: &DetectionThresholds,
        policy: &PersonaPolicy,
        limits: &EngagementLimits,
        now: Timestamp,
    ) -> Result<Evaluation, DomainError> {
        let previous = self.detection_state;
        self.peak_confidence = self.peak_confidence.max(detection.confidence);

        let mut persona_assigned = None;
        let target = match previous {
            DetectionState::Detecting if detection.confidence.meets(thresholds.scam_threshold) => {
                DetectionState::Engaged
            }
            DetectionState::Detecting => DetectionState::Declined,
            DetectionState::Engaged => DetectionState::Engaged,
            other => {
                return Err(DomainError::new(
                    ErrorCode::InvalidStateTransition,
                    format!("Cannot evaluate a turn while {}", other),
                ))
            }
        };
        self.detection_state = previous.transition_to(target)?;

        if previous == DetectionState::Detecting && target == DetectionState::Engaged {
            let persona = policy.select(detection.category);
            self.assign_persona(persona)?;
            self.category = Some(detection.category);
            self.engaged_at = Some(now);
            self.engagement_deadline = Some(now.plus_secs(limits.time_budget_secs));
            persona_assigned = Some(persona);
        }

        if self.is_engaged() && self.peak_confidence.meets(thresholds.high_confidence_threshold) {
            self.mode = EngagementMode::ExtractionFocused;
        }

        Ok(Evaluation {
            previous,
            current: self.detection_state,
            persona_assigned,
        })
    }

    fn assign_persona(&mut self, persona: Persona) -> Result<(), DomainError> {
        if let Some(existing) = self.active_persona {
            return Err(DomainError::new(
                ErrorCode::PersonaAlreadyAssigned,
                format!("Persona {} already assigned", existing),
            )
            .with_detail("requested", persona.as_str()));
        }
        self.active_persona = Some(persona);
        Ok(())
    }

    /// Terminates the session when a budget is exhausted or extraction is
    /// complete. Returns the reason when this call terminated it.
    ///
    /// The time budget runs from engagement start for engaged sessions and
    /// from session creation otherwise.
    pub fn check_termination(
        &mut self,
        artifacts: &ArtifactSet,
        thresholds: &DetectionThresholds,
        limits: &EngagementLimits,
        now: Timestamp,
    ) -> Result<Option<TerminationReason>, DomainError> {
        if self.is_terminated() || self.detection_state == DetectionState::New {
            return Ok(None);
        }

        let deadline = self
            .engagement_deadline
            .unwrap_or_else(|| self.created_at.plus_secs(limits.time_budget_secs));

        let reason = if self.turn_count >= limits.max_turns {
            Some(TerminationReason::TurnBudgetExhausted)
        } else if !now.is_before(&deadline) {
            Some(TerminationReason::TimeBudgetExhausted)
        } else if self.is_engaged()
            && self.turn_count >= limits.min_turns_before_completion
            && artifacts.is_complete(&limits.target_types, thresholds.high_confidence_threshold)
        {
            Some(TerminationReason::ExtractionComplete)
        } else {
            None
        };

        if let Some(reason) = reason {
            self.detection_state = self
                .detection_state
                .transition_to(DetectionState::Terminated)?;
            self.termination_reason = Some(reason);
        }
        Ok(reason)
    }

    /// Realigns turn bookkeeping with the stored turn log.
    ///
    /// A commit that failed after appending turns leaves the saved session
    /// behind its turns. Sequences continue after the highest stored one and
    /// `turn_count` becomes the stored inbound count. Returns true when
    /// anything changed.
    pub fn reconcile(&mut self, stored_turns: &[Turn]) -> bool {
        let inbound = stored_turns.iter().filter(|turn| turn.is_inbound()).count();
        let inbound = u32::try_from(inbound).unwrap_or(u32::MAX);
        let next_sequence = stored_turns
            .iter()
            .map(Turn::sequence)
            .max()
            .map_or(TurnSequence::FIRST, |last| last.next())
            .max(self.next_sequence);
        let latest_activity = stored_turns
            .iter()
            .map(|turn| *turn.created_at())
            .fold(self.last_activity_at, Timestamp::max);

        let changed = inbound != self.turn_count || next_sequence != self.next_sequence;
        self.turn_count = inbound;
        self.next_sequence = next_sequence;
        self.last_activity_at = latest_activity;
        changed
    }

    /// Checks the aggregate against the persisted inbound turn count.
    pub fn verify_invariants(&self, inbound_turns: usize) -> Result<(), DomainError> {
        if self.turn_count as usize != inbound_turns {
            return Err(DomainError::invariant(format!(
                "turn_count {} does not match {} inbound turns",
                self.turn_count, inbound_turns
            ))
            .with_detail("session_id", self.id.as_str()));
        }
        if self.active_persona.is_some() != self.was_engaged() {
            return Err(DomainError::invariant(
                "persona must be assigned exactly when engagement starts",
            )
            .with_detail("session_id", self.id.as_str()));
        }
        Ok(())
    }
}

impl EngagementLimits {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_turns == 0 {
            return Err(ValidationError::out_of_range("max_turns", 1, 1000, 0));
        }
        if self.time_budget_secs == 0 || self.time_budget_secs > MAX_TIME_BUDGET_SECS {
            return Err(ValidationError::out_of_range(
                "time_budget_secs",
                1,
                MAX_TIME_BUDGET_SECS as i64,
                self.time_budget_secs.min(i64::MAX as u64) as i64,
            ));
        }
        if self.target_types.is_empty() {
            return Err(ValidationError::empty_field("target_types"));
        }
        Ok(())
    }
}
