//! Semantic classifier - model-backed scam category judgment.

use std::sync::Arc;
use tracing::{debug, warn};

use super::{CompletionGateway, CompletionOutcome};
use crate::domain::detection::{parse_classification_reply, SemanticJudgment};
use crate::domain::engagement::{classification_prompt, HistoryEntry, CLASSIFICATION_SYSTEM_PROMPT};
use crate::ports::{CompletionPurpose, CompletionRequest};

const CLASSIFICATION_TEMPERATURE: f32 = 0.3;
const CLASSIFICATION_MAX_TOKENS: u32 = 100;

/// Asks the completion capability for a category and confidence.
pub struct SemanticClassifier {
    gateway: Arc<CompletionGateway>,
    history_window: usize,
}

impl SemanticClassifier {
    pub fn new(gateway: Arc<CompletionGateway>, history_window: usize) -> Self {
        Self {
            gateway,
            history_window,
        }
    }

    /// Classifies `message` in the light of the last `history_window`
    /// entries of `history` (oldest first).
    ///
    /// Never fails: an unavailable service or an unparseable reply yields
    /// `SemanticJudgment::Unavailable`.
    pub async fn classify(&self, message: &str, history: &[HistoryEntry]) -> SemanticJudgment {
        let recent = &history[history.len().saturating_sub(self.history_window)..];
        let request = CompletionRequest::new(CompletionPurpose::Classification)
            .with_system_prompt(CLASSIFICATION_SYSTEM_PROMPT)
            .with_prompt(classification_prompt(message, recent))
            .with_temperature(CLASSIFICATION_TEMPERATURE)
            .with_max_tokens(CLASSIFICATION_MAX_TOKENS);

        match self.gateway.complete(request).await {
            CompletionOutcome::Completed(response) => {
                match parse_classification_reply(&response.content) {
                    Some(judgment) => {
                        debug!(?judgment, "Semantic judgment");
                        judgment
                    }
                    None => {
                        warn!(reply = %response.content, "Unparseable classification reply");
                        SemanticJudgment::Unavailable
                    }
                }
            }
            CompletionOutcome::Unavailable { .. } => SemanticJudgment::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockCompletionProvider;
    use crate::domain::detection::ScamCategory;
    use crate::domain::engagement::TurnRole;

    fn classifier(provider: &MockCompletionProvider, window: usize) -> SemanticClassifier {
        let gateway = CompletionGateway::new(Arc::new(provider.clone()));
        SemanticClassifier::new(Arc::new(gateway), window)
    }

    #[tokio::test]
    async fn parses_labelled_reply() {
        let provider =
            MockCompletionProvider::new().with_response("Category: lottery_prize\nConfidence: 0.95");

        let judgment = classifier(&provider, 6).classify("You won!", &[]).await;

        assert_eq!(judgment.category(), Some(ScamCategory::LotteryPrize));
        assert!(judgment.is_available());
    }

    #[tokio::test]
    async fn unparseable_reply_is_unavailable() {
        let provider = MockCompletionProvider::new().with_response("I cannot help with that");

        let judgment = classifier(&provider, 6).classify("hello", &[]).await;

        assert_eq!(judgment, SemanticJudgment::Unavailable);
    }

    #[tokio::test]
    async fn service_failure_is_unavailable() {
        let provider = MockCompletionProvider::unavailable();

        let judgment = classifier(&provider, 6).classify("hello", &[]).await;

        assert_eq!(judgment, SemanticJudgment::Unavailable);
    }

    #[tokio::test]
    async fn prompt_includes_only_the_history_window() {
        let provider = MockCompletionProvider::new().with_response("Category: legitimate\nConfidence: 0.9");
        let history: Vec<HistoryEntry> = (0..5)
            .map(|i| HistoryEntry::new(TurnRole::Inbound, format!("earlier message {i}")))
            .collect();

        classifier(&provider, 2).classify("latest", &history).await;

        let prompt = provider.get_calls()[0].last_user_message().unwrap();
        assert!(!prompt.contains("earlier message 2"));
        assert!(prompt.contains("earlier message 3"));
        assert!(prompt.contains("earlier message 4"));
        assert_eq!(
            provider.get_calls()[0].purpose,
            CompletionPurpose::Classification
        );
    }
}
