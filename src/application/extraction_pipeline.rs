//! Intelligence extraction pipeline.
//!
//! Regex extraction and contextual validation are pure and live in the
//! domain. This service adds the optional verification call and merges the
//! settled artifacts into the session's set.

use std::sync::Arc;
use tracing::{debug, warn};

use super::{CompletionGateway, CompletionOutcome};
use crate::domain::intelligence::{
    build_verification_prompt, parse_verification_reply, settle_candidates, Artifact, ArtifactSet,
    CandidateExtractor, TextSegment, VERIFICATION_SYSTEM_PROMPT,
};
use crate::ports::{CompletionPurpose, CompletionRequest};

const VERIFICATION_TEMPERATURE: f32 = 0.1;
const VERIFICATION_MAX_TOKENS: u32 = 400;

/// What one extraction run changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutcome {
    /// Artifacts settled from this turn's scan, before deduplication.
    pub observed: Vec<Artifact>,
    /// Stored form of every artifact inserted or raised by this run.
    pub delta: Vec<Artifact>,
    /// True when verification was wanted but the service was unavailable.
    pub verification_unavailable: bool,
}

pub struct ExtractionPipeline {
    extractor: CandidateExtractor,
    gateway: Arc<CompletionGateway>,
    semantic_verification: bool,
}

impl ExtractionPipeline {
    pub fn new(gateway: Arc<CompletionGateway>, semantic_verification: bool) -> Self {
        Self {
            extractor: CandidateExtractor::new(),
            gateway,
            semantic_verification,
        }
    }

    /// Scans `segments`, verifies and scores the candidates, and merges them
    /// into `known`.
    ///
    /// `message` is the current inbound text, shown to the verifier as
    /// context.
    pub async fn run(
        &self,
        segments: &[TextSegment],
        message: &str,
        known: &mut ArtifactSet,
    ) -> ExtractionOutcome {
        let candidates = self.extractor.extract(segments);
        if candidates.is_empty() {
            return ExtractionOutcome::default();
        }
        debug!(count = candidates.len(), "Artifact candidates");

        let mut verification_unavailable = false;
        let statuses = if self.semantic_verification {
            let request = CompletionRequest::new(CompletionPurpose::Verification)
                .with_system_prompt(VERIFICATION_SYSTEM_PROMPT)
                .with_prompt(build_verification_prompt(&candidates, message))
                .with_temperature(VERIFICATION_TEMPERATURE)
                .with_max_tokens(VERIFICATION_MAX_TOKENS);

            match self.gateway.complete(request).await {
                CompletionOutcome::Completed(response) => {
                    let parsed = parse_verification_reply(&response.content, candidates.len());
                    if parsed.is_none() {
                        warn!("Unparseable verification reply, candidates stay unverified");
                    }
                    parsed
                }
                CompletionOutcome::Unavailable { .. } => {
                    verification_unavailable = true;
                    None
                }
            }
        } else {
            None
        };

        let observed = settle_candidates(candidates, statuses.as_deref());
        let delta = known.merge_all(observed.iter().cloned());

        ExtractionOutcome {
            observed,
            delta,
            verification_unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockCompletionProvider;
    use crate::domain::foundation::TurnSequence;
    use crate::domain::intelligence::ArtifactType;

    const LOTTERY: &str =
        "Congratulations! You've won Rs. 50,000 in our lucky draw! Send processing fee to UPI ID: winner@paytm";

    fn pipeline(provider: &MockCompletionProvider, verify: bool) -> ExtractionPipeline {
        let gateway = CompletionGateway::new(Arc::new(provider.clone()));
        ExtractionPipeline::new(Arc::new(gateway), verify)
    }

    fn segment(turn: u32, text: &str) -> Vec<TextSegment> {
        vec![TextSegment::new(TurnSequence::new(turn), text)]
    }

    #[tokio::test]
    async fn confirmed_handle_is_verified_and_scored_high() {
        let provider =
            MockCompletionProvider::new().with_response(r#"[{"index":0,"valid":true,"normalized":"winner@paytm"}]"#);
        let mut known = ArtifactSet::new();

        let outcome = pipeline(&provider, true)
            .run(&segment(1, LOTTERY), LOTTERY, &mut known)
            .await;

        let handle = known.get(ArtifactType::PaymentHandle, "winner@paytm").unwrap();
        assert!(handle.verified);
        assert!(handle.confidence.meets(0.9));
        assert_eq!(outcome.delta.len(), 1);
        assert!(!outcome.verification_unavailable);
    }

    #[tokio::test]
    async fn rejected_candidate_is_dropped() {
        let provider = MockCompletionProvider::new().with_response(r#"[{"index":0,"valid":false}]"#);
        let mut known = ArtifactSet::new();

        let outcome = pipeline(&provider, true)
            .run(&segment(1, LOTTERY), LOTTERY, &mut known)
            .await;

        assert!(known.is_empty());
        assert!(outcome.observed.is_empty());
    }

    #[tokio::test]
    async fn unavailable_verifier_leaves_candidates_unverified() {
        let provider = MockCompletionProvider::unavailable();
        let mut known = ArtifactSet::new();

        let outcome = pipeline(&provider, true)
            .run(&segment(1, LOTTERY), LOTTERY, &mut known)
            .await;

        let handle = known.get(ArtifactType::PaymentHandle, "winner@paytm").unwrap();
        assert!(!handle.verified);
        assert!(handle.confidence.meets(0.5));
        assert!(outcome.verification_unavailable);
    }

    #[tokio::test]
    async fn verification_disabled_makes_no_call() {
        let provider = MockCompletionProvider::new();
        let mut known = ArtifactSet::new();

        pipeline(&provider, false)
            .run(&segment(1, LOTTERY), LOTTERY, &mut known)
            .await;

        assert_eq!(provider.call_count(), 0);
        assert_eq!(known.len(), 1);
    }

    #[tokio::test]
    async fn no_candidates_skips_verification() {
        let provider = MockCompletionProvider::new();
        let mut known = ArtifactSet::new();
        let text = "See you at the meeting tomorrow";

        let outcome = pipeline(&provider, true)
            .run(&segment(1, text), text, &mut known)
            .await;

        assert_eq!(provider.call_count(), 0);
        assert_eq!(outcome, ExtractionOutcome::default());
    }

    #[tokio::test]
    async fn repeat_observation_is_not_in_delta() {
        let provider = MockCompletionProvider::new();
        let mut known = ArtifactSet::new();
        let pipeline = pipeline(&provider, false);

        pipeline.run(&segment(1, LOTTERY), LOTTERY, &mut known).await;
        let second = pipeline.run(&segment(3, LOTTERY), LOTTERY, &mut known).await;

        assert_eq!(known.len(), 1);
        assert!(second.delta.is_empty());
        assert_eq!(
            known.get(ArtifactType::PaymentHandle, "winner@paytm").unwrap().first_seen,
            TurnSequence::new(1)
        );
    }
}
