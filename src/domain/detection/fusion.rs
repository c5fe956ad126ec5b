//! Confidence fusion.
//!
//! Combines the lexical, semantic and historical-context layers into one
//! calibrated scam confidence and picks the most likely category.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LexicalAnalysis, ScamCategory, SemanticJudgment};
use crate::domain::foundation::{Confidence, ValidationError};

/// Below this fused confidence the category is always `Legitimate`.
pub const LEGITIMATE_CEILING: f64 = 0.5;

/// Relative weight of each detection layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    #[serde(default = "default_lexical_weight")]
    pub lexical: f64,
    #[serde(default = "default_contextual_weight")]
    pub contextual: f64,
    #[serde(default = "default_semantic_weight")]
    pub semantic: f64,
}

fn default_lexical_weight() -> f64 {
    0.3
}

fn default_contextual_weight() -> f64 {
    0.3
}

fn default_semantic_weight() -> f64 {
    0.4
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            lexical: default_lexical_weight(),
            contextual: default_contextual_weight(),
            semantic: default_semantic_weight(),
        }
    }
}

impl FusionWeights {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, w) in [
            ("weights.lexical", self.lexical),
            ("weights.contextual", self.contextual),
            ("weights.semantic", self.semantic),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(ValidationError::invalid_format(
                    field,
                    "weight must be a non-negative number",
                ));
            }
        }
        if self.lexical + self.contextual <= 0.0 {
            return Err(ValidationError::invalid_format(
                "weights",
                "lexical and contextual weights cannot both be zero",
            ));
        }
        Ok(())
    }
}

/// Tuning for the historical-context layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextTuning {
    /// Damping applied to the provisional score when there is no history.
    #[serde(default = "default_cold_start_factor")]
    pub cold_start_factor: f64,
    /// Multiplier for the confidence trend across turns.
    #[serde(default = "default_trend_gain")]
    pub trend_gain: f64,
    /// Absolute bound on the trend contribution.
    #[serde(default = "default_max_trend_adjustment")]
    pub max_trend_adjustment: f64,
}

fn default_cold_start_factor() -> f64 {
    0.75
}

fn default_trend_gain() -> f64 {
    0.5
}

fn default_max_trend_adjustment() -> f64 {
    0.15
}

impl Default for ContextTuning {
    fn default() -> Self {
        Self {
            cold_start_factor: default_cold_start_factor(),
            trend_gain: default_trend_gain(),
            max_trend_adjustment: default_max_trend_adjustment(),
        }
    }
}

impl ContextTuning {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, v) in [
            ("context.cold_start_factor", self.cold_start_factor),
            ("context.trend_gain", self.trend_gain),
            ("context.max_trend_adjustment", self.max_trend_adjustment),
        ] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(ValidationError::invalid_format(
                    field,
                    "must be between 0.0 and 1.0",
                ));
            }
        }
        Ok(())
    }
}

/// Ephemeral per-turn detection outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub category: ScamCategory,
    pub confidence: Confidence,
    pub lexical: Confidence,
    /// `None` when the semantic layer was unavailable.
    pub semantic: Option<Confidence>,
    pub contextual: Confidence,
}

impl DetectionResult {
    /// A result with no evidence at all.
    pub fn legitimate() -> Self {
        Self {
            category: ScamCategory::Legitimate,
            confidence: Confidence::ZERO,
            lexical: Confidence::ZERO,
            semantic: None,
            contextual: Confidence::ZERO,
        }
    }

    pub fn semantic_available(&self) -> bool {
        self.semantic.is_some()
    }
}

/// Weighted mean of the available layer scores.
///
/// The semantic weight drops to zero when the layer is unavailable and the
/// remaining weights are renormalized. Monotone non-decreasing in each score.
pub fn fuse_scores(
    weights: &FusionWeights,
    lexical: Confidence,
    semantic: Option<Confidence>,
    contextual: Confidence,
) -> Confidence {
    let mut total = weights.lexical * lexical.value() + weights.contextual * contextual.value();
    let mut weight_sum = weights.lexical + weights.contextual;
    if let Some(semantic) = semantic {
        total += weights.semantic * semantic.value();
        weight_sum += weights.semantic;
    }
    if weight_sum <= 0.0 {
        return Confidence::ZERO;
    }
    Confidence::clamped(total / weight_sum)
}

/// This turn's score before context is applied.
pub fn provisional_score(
    weights: &FusionWeights,
    lexical: Confidence,
    semantic: Option<Confidence>,
) -> Confidence {
    let mut total = weights.lexical * lexical.value();
    let mut weight_sum = weights.lexical;
    if let Some(semantic) = semantic {
        total += weights.semantic * semantic.value();
        weight_sum += weights.semantic;
    }
    if weight_sum <= 0.0 {
        return Confidence::ZERO;
    }
    Confidence::clamped(total / weight_sum)
}

/// Historical-context score from prior per-turn confidences (oldest first).
pub fn contextual_score(
    tuning: &ContextTuning,
    provisional: Confidence,
    history: &[Confidence],
) -> Confidence {
    if history.is_empty() {
        return Confidence::clamped(provisional.value() * tuning.cold_start_factor);
    }

    let mean = history.iter().map(Confidence::value).sum::<f64>() / history.len() as f64;
    // Average step across the history followed by this turn.
    let slope = (provisional.value() - history[0].value()) / history.len() as f64;
    let trend = (tuning.trend_gain * slope)
        .clamp(-tuning.max_trend_adjustment, tuning.max_trend_adjustment);

    Confidence::clamped(0.5 * provisional.value() + 0.5 * mean + trend)
}

/// Stateless fusion of the three detection layers.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceFusion {
    weights: FusionWeights,
    tuning: ContextTuning,
}

impl ConfidenceFusion {
    pub fn new(weights: FusionWeights, tuning: ContextTuning) -> Self {
        Self { weights, tuning }
    }

    pub fn weights(&self) -> &FusionWeights {
        &self.weights
    }

    /// Fuses one turn.
    ///
    /// `history` holds the session's prior per-turn confidences, oldest
    /// first, already limited to the configured window.
    pub fn fuse(
        &self,
        lexical: &LexicalAnalysis,
        semantic: &SemanticJudgment,
        history: &[Confidence],
    ) -> DetectionResult {
        let lexical_score = lexical.scam_score();
        let semantic_score = semantic.scam_score();
        let provisional = provisional_score(&self.weights, lexical_score, semantic_score);
        let contextual = contextual_score(&self.tuning, provisional, history);
        let confidence = fuse_scores(&self.weights, lexical_score, semantic_score, contextual);
        let category = self.select_category(lexical, semantic, confidence);

        debug!(
            lexical = lexical_score.value(),
            semantic = semantic_score.map(|s| s.value()),
            contextual = contextual.value(),
            fused = confidence.value(),
            category = %category,
            "Fused detection layers"
        );

        DetectionResult {
            category,
            confidence,
            lexical: lexical_score,
            semantic: semantic_score,
            contextual,
        }
    }

    fn select_category(
        &self,
        lexical: &LexicalAnalysis,
        semantic: &SemanticJudgment,
        confidence: Confidence,
    ) -> ScamCategory {
        if confidence.value() < LEGITIMATE_CEILING {
            return ScamCategory::Legitimate;
        }
        let semantic_weight = if semantic.is_available() {
            self.weights.semantic
        } else {
            0.0
        };

        let mut best = ScamCategory::Legitimate;
        let mut best_score = 0.0;
        for category in ScamCategory::scam_categories() {
            let score = self.weights.lexical * lexical.category_score(*category).value()
                + semantic_weight * semantic.support_for(*category).value();
            if score > best_score {
                best = *category;
                best_score = score;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::LexicalSignalExtractor;
    use proptest::prelude::*;

    fn c(v: f64) -> Confidence {
        Confidence::clamped(v)
    }

    mod weights {
        use super::*;

        #[test]
        fn defaults_match_documented_values() {
            let w = FusionWeights::default();
            assert_eq!((w.lexical, w.contextual, w.semantic), (0.3, 0.3, 0.4));
            assert!(w.validate().is_ok());
        }

        #[test]
        fn negative_weight_is_rejected() {
            let w = FusionWeights {
                lexical: -0.1,
                ..Default::default()
            };
            assert!(w.validate().is_err());
        }

        #[test]
        fn semantic_only_weights_are_rejected() {
            let w = FusionWeights {
                lexical: 0.0,
                contextual: 0.0,
                semantic: 1.0,
            };
            assert!(w.validate().is_err());
        }
    }

    mod scores {
        use super::*;

        #[test]
        fn unavailable_semantic_renormalizes_remaining_weights() {
            let w = FusionWeights::default();
            let fused = fuse_scores(&w, c(0.8), None, c(0.4));
            assert!((fused.value() - 0.6).abs() < 1e-9);
        }

        #[test]
        fn all_layers_weighted() {
            let w = FusionWeights::default();
            let fused = fuse_scores(&w, c(1.0), Some(c(1.0)), c(0.0));
            assert!((fused.value() - 0.7).abs() < 1e-9);
        }

        #[test]
        fn cold_start_dampens_provisional() {
            let ctx = contextual_score(&ContextTuning::default(), c(0.8), &[]);
            assert!((ctx.value() - 0.6).abs() < 1e-9);
        }

        #[test]
        fn rising_history_reinforces() {
            let tuning = ContextTuning::default();
            let rising = contextual_score(&tuning, c(0.8), &[c(0.2), c(0.5)]);
            let flat = contextual_score(&tuning, c(0.8), &[c(0.35), c(0.35)]);
            assert!(rising > flat, "rising={rising} flat={flat}");
        }

        #[test]
        fn isolated_spike_after_quiet_history_is_dampened() {
            let tuning = ContextTuning::default();
            let ctx = contextual_score(&tuning, c(0.9), &[c(0.05), c(0.05), c(0.05)]);
            assert!(ctx.value() < 0.9 * 0.75);
        }

        #[test]
        fn trend_is_bounded() {
            let tuning = ContextTuning::default();
            let ctx = contextual_score(&tuning, c(1.0), &[c(0.0)]);
            let expected = 0.5 + tuning.max_trend_adjustment;
            assert!((ctx.value() - expected).abs() < 1e-9);
        }
    }

    mod fusion {
        use super::*;

        fn fuse(text: &str, semantic: SemanticJudgment) -> DetectionResult {
            let lexical = LexicalSignalExtractor::new().analyze(text);
            ConfidenceFusion::default().fuse(&lexical, &semantic, &[])
        }

        #[test]
        fn lottery_message_with_agreeing_model_engages() {
            let result = fuse(
                "Congratulations! You've won Rs. 50,000... UPI ID: winner@paytm",
                SemanticJudgment::available(ScamCategory::LotteryPrize, c(0.95)),
            );
            assert_eq!(result.category, ScamCategory::LotteryPrize);
            assert!(result.confidence.value() >= 0.7);
        }

        #[test]
        fn ordinary_message_is_legitimate() {
            let result = fuse(
                "See you at the meeting tomorrow",
                SemanticJudgment::available(ScamCategory::Legitimate, c(0.9)),
            );
            assert_eq!(result.category, ScamCategory::Legitimate);
            assert!(result.confidence.value() < 0.5);
        }

        #[test]
        fn unavailable_semantic_is_reported_and_bounded() {
            let result = fuse(
                "Congratulations! You've won a prize, pay the processing fee",
                SemanticJudgment::Unavailable,
            );
            assert!(!result.semantic_available());
            assert!(result.confidence.value() <= 1.0);
            assert_eq!(result.category, ScamCategory::LotteryPrize);
        }

        #[test]
        fn no_evidence_is_legitimate() {
            let result = fuse("hello", SemanticJudgment::Unavailable);
            assert_eq!(result.category, ScamCategory::Legitimate);
            assert_eq!(result.confidence, Confidence::ZERO);
        }

        #[test]
        fn model_breaks_lexical_tie() {
            // "payment" and "otp" tie lexically; the model decides.
            let result = fuse(
                "urgent payment otp",
                SemanticJudgment::available(ScamCategory::Phishing, c(0.9)),
            );
            assert_eq!(result.category, ScamCategory::Phishing);
        }

        #[test]
        fn lexical_tie_without_model_follows_declaration_order() {
            let lexical = LexicalSignalExtractor::new().analyze("payment otp payment otp");
            let fusion = ConfidenceFusion::default();
            let category = fusion.select_category(&lexical, &SemanticJudgment::Unavailable, c(0.9));
            assert_eq!(category, ScamCategory::FinancialFraud);
        }
    }

    proptest! {
        #[test]
        fn fused_score_is_monotone_in_each_layer(
            lex in 0.0f64..=1.0,
            sem in 0.0f64..=1.0,
            ctx in 0.0f64..=1.0,
            bump in 0.0f64..=1.0,
            wl in 0.01f64..=1.0,
            wc in 0.01f64..=1.0,
            ws in 0.0f64..=1.0,
        ) {
            let w = FusionWeights { lexical: wl, contextual: wc, semantic: ws };
            let base = fuse_scores(&w, c(lex), Some(c(sem)), c(ctx)).value();
            let up = |v: f64| (v + bump).min(1.0);

            prop_assert!(fuse_scores(&w, c(up(lex)), Some(c(sem)), c(ctx)).value() >= base - 1e-12);
            prop_assert!(fuse_scores(&w, c(lex), Some(c(up(sem))), c(ctx)).value() >= base - 1e-12);
            prop_assert!(fuse_scores(&w, c(lex), Some(c(sem)), c(up(ctx))).value() >= base - 1e-12);
        }

        #[test]
        fn contextual_score_is_monotone_in_provisional(
            p in 0.0f64..=1.0,
            bump in 0.0f64..=1.0,
            history in proptest::collection::vec(0.0f64..=1.0, 0..6),
        ) {
            let tuning = ContextTuning::default();
            let history: Vec<Confidence> = history.into_iter().map(c).collect();
            let low = contextual_score(&tuning, c(p), &history);
            let high = contextual_score(&tuning, c((p + bump).min(1.0)), &history);
            prop_assert!(high.value() >= low.value() - 1e-12);
        }

        #[test]
        fn fused_score_stays_in_unit_interval(
            lex in 0.0f64..=1.0,
            sem in proptest::option::of(0.0f64..=1.0),
            ctx in 0.0f64..=1.0,
        ) {
            let fused = fuse_scores(&FusionWeights::default(), c(lex), sem.map(c), c(ctx));
            prop_assert!((0.0..=1.0).contains(&fused.value()));
        }
    }
}
