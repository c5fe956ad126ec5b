//! Semantic judgments produced by a language model.

use serde::{Deserialize, Serialize};

use super::ScamCategory;
use crate::domain::foundation::Confidence;

/// Confidence assumed when the model names a category but no score.
const DEFAULT_REPLY_CONFIDENCE: f64 = 0.5;

/// Outcome of asking the completion capability to classify a message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SemanticJudgment {
    Available {
        category: ScamCategory,
        confidence: Confidence,
    },
    Unavailable,
}

impl SemanticJudgment {
    pub fn available(category: ScamCategory, confidence: Confidence) -> Self {
        SemanticJudgment::Available {
            category,
            confidence,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SemanticJudgment::Available { .. })
    }

    pub fn category(&self) -> Option<ScamCategory> {
        match self {
            SemanticJudgment::Available { category, .. } => Some(*category),
            SemanticJudgment::Unavailable => None,
        }
    }

    /// Probability that the message is a scam, as judged by the model.
    ///
    /// A confident `legitimate` verdict is strong evidence against a scam,
    /// so its confidence is inverted.
    pub fn scam_score(&self) -> Option<Confidence> {
        match self {
            SemanticJudgment::Available {
                category,
                confidence,
            } => Some(if category.is_scam() {
                *confidence
            } else {
                confidence.complement()
            }),
            SemanticJudgment::Unavailable => None,
        }
    }

    /// Support this judgment lends to a specific scam category.
    pub fn support_for(&self, target: ScamCategory) -> Confidence {
        match self {
            SemanticJudgment::Available {
                category,
                confidence,
            } if *category == target && target.is_scam() => *confidence,
            _ => Confidence::ZERO,
        }
    }
}

#[derive(Deserialize)]
struct JsonVerdict {
    category: String,
    #[serde(default)]
    confidence: Option<serde_json::Value>,
}

/// Parses a classification reply.
///
/// Accepts `Category: x` / `Confidence: y` lines in any order, or a JSON
/// object with `category` and `confidence`, optionally wrapped in prose or a
/// code fence. Returns `None` when no known category can be recovered.
pub fn parse_classification_reply(reply: &str) -> Option<SemanticJudgment> {
    parse_labelled_lines(reply).or_else(|| parse_json_object(reply))
}

fn parse_labelled_lines(reply: &str) -> Option<SemanticJudgment> {
    let mut category = None;
    let mut confidence = None;

    for line in reply.lines() {
        let line = line.trim().trim_start_matches(['*', '-', '#', ' ']);
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_matches('*').to_lowercase();
        if key == "category" && category.is_none() {
            category = ScamCategory::parse_label(value);
        } else if key == "confidence" && confidence.is_none() {
            confidence = parse_confidence_text(value);
        }
    }

    let category = category?;
    let confidence = confidence.unwrap_or(Confidence::clamped(DEFAULT_REPLY_CONFIDENCE));
    Some(SemanticJudgment::available(category, confidence))
}

fn parse_json_object(reply: &str) -> Option<SemanticJudgment> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    let verdict: JsonVerdict = serde_json::from_str(&reply[start..=end]).ok()?;
    let category = ScamCategory::parse_label(&verdict.category)?;
    let confidence = match verdict.confidence {
        Some(serde_json::Value::Number(n)) => n.as_f64().map(normalize_score),
        Some(serde_json::Value::String(s)) => parse_confidence_text(&s),
        _ => None,
    }
    .unwrap_or(Confidence::clamped(DEFAULT_REPLY_CONFIDENCE));
    Some(SemanticJudgment::available(category, confidence))
}

/// Reads the first number in `text`; percentages are scaled to [0,1].
fn parse_confidence_text(text: &str) -> Option<Confidence> {
    let trimmed = text.trim();
    let number: String = trimmed
        .chars()
        .skip_while(|c| !c.is_ascii_digit() && *c != '.')
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = number.parse().ok()?;
    if trimmed.contains('%') {
        return Some(Confidence::clamped(value / 100.0));
    }
    Some(normalize_score(value))
}

fn normalize_score(value: f64) -> Confidence {
    if value > 1.0 && value <= 100.0 {
        Confidence::clamped(value / 100.0)
    } else {
        Confidence::clamped(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod judgment {
        use super::*;

        #[test]
        fn scam_category_scores_its_confidence() {
            let j = SemanticJudgment::available(ScamCategory::Phishing, Confidence::clamped(0.8));
            assert_eq!(j.scam_score(), Some(Confidence::clamped(0.8)));
        }

        #[test]
        fn legitimate_verdict_inverts_confidence() {
            let j =
                SemanticJudgment::available(ScamCategory::Legitimate, Confidence::clamped(0.9));
            let score = j.scam_score().unwrap().value();
            assert!((score - 0.1).abs() < 1e-9);
        }

        #[test]
        fn unavailable_has_no_score() {
            assert_eq!(SemanticJudgment::Unavailable.scam_score(), None);
            assert!(!SemanticJudgment::Unavailable.is_available());
        }

        #[test]
        fn support_only_for_judged_scam_category() {
            let j = SemanticJudgment::available(
                ScamCategory::LotteryPrize,
                Confidence::clamped(0.95),
            );
            assert_eq!(
                j.support_for(ScamCategory::LotteryPrize),
                Confidence::clamped(0.95)
            );
            assert_eq!(j.support_for(ScamCategory::Phishing), Confidence::ZERO);
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn parses_labelled_lines() {
            let j = parse_classification_reply("Category: lottery_prize\nConfidence: 0.95").unwrap();
            assert_eq!(j.category(), Some(ScamCategory::LotteryPrize));
            assert_eq!(j.scam_score(), Some(Confidence::clamped(0.95)));
        }

        #[test]
        fn parses_markdown_decorated_lines() {
            let j = parse_classification_reply("**Category:** Phishing\n**Confidence:** 85%")
                .unwrap();
            assert_eq!(j.category(), Some(ScamCategory::Phishing));
            assert_eq!(j.scam_score(), Some(Confidence::clamped(0.85)));
        }

        #[test]
        fn parses_json_inside_prose() {
            let reply = "Here you go:\n```json\n{\"category\": \"tech_support\", \"confidence\": 0.7}\n```";
            let j = parse_classification_reply(reply).unwrap();
            assert_eq!(j.category(), Some(ScamCategory::TechSupport));
        }

        #[test]
        fn missing_confidence_defaults_to_midpoint() {
            let j = parse_classification_reply("Category: romance").unwrap();
            assert_eq!(j.scam_score(), Some(Confidence::clamped(0.5)));
        }

        #[test]
        fn unknown_category_is_unparseable() {
            assert!(parse_classification_reply("Category: weather\nConfidence: 0.9").is_none());
            assert!(parse_classification_reply("I cannot help with that").is_none());
        }

        #[test]
        fn out_of_range_confidence_is_clamped() {
            let j = parse_classification_reply("Category: phishing\nConfidence: 250").unwrap();
            assert_eq!(j.scam_score(), Some(Confidence::ONE));
        }
    }
}
