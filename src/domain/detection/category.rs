//! Scam category classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of message categories the detector can assign.
///
/// Declaration order is significant: it breaks ties when two categories
/// score the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScamCategory {
    /// Requests for money, bank details, investment schemes.
    FinancialFraud,
    /// Suspicious links, credential or OTP requests.
    Phishing,
    /// Claims of winning a lottery, prize or reward.
    LotteryPrize,
    /// Fake technical support, remote access requests.
    TechSupport,
    /// Emotional manipulation leading to financial requests.
    Romance,
    /// Normal, non-scam messages.
    Legitimate,
}

impl ScamCategory {
    /// Returns all categories in declaration order.
    pub fn all() -> &'static [ScamCategory] {
        &[
            ScamCategory::FinancialFraud,
            ScamCategory::Phishing,
            ScamCategory::LotteryPrize,
            ScamCategory::TechSupport,
            ScamCategory::Romance,
            ScamCategory::Legitimate,
        ]
    }

    /// Returns every category except `Legitimate`.
    pub fn scam_categories() -> &'static [ScamCategory] {
        &Self::all()[..5]
    }

    /// Returns true for every category other than `Legitimate`.
    pub fn is_scam(&self) -> bool {
        !matches!(self, ScamCategory::Legitimate)
    }

    /// Stable wire label, also used inside prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScamCategory::FinancialFraud => "financial_fraud",
            ScamCategory::Phishing => "phishing",
            ScamCategory::LotteryPrize => "lottery_prize",
            ScamCategory::TechSupport => "tech_support",
            ScamCategory::Romance => "romance",
            ScamCategory::Legitimate => "legitimate",
        }
    }

    /// One-line description used in the classification prompt.
    pub fn description(&self) -> &'static str {
        match self {
            ScamCategory::FinancialFraud => "Requests for money, bank details, investment schemes",
            ScamCategory::Phishing => "Suspicious links, credential requests, fake login pages",
            ScamCategory::LotteryPrize => "Claims of winning prizes, lottery scams",
            ScamCategory::TechSupport => "Fake technical support, remote access requests",
            ScamCategory::Romance => "Emotional manipulation leading to financial requests",
            ScamCategory::Legitimate => "Normal, non-scam messages",
        }
    }

    /// Parses a free-form label produced by a language model.
    ///
    /// Accepts the wire label, spaces or dashes instead of underscores, and
    /// labels embedded in a longer phrase ("probably phishing"). Legitimate
    /// and negated verdicts ("not fraud") win over any scam word in the
    /// phrase; otherwise the earliest scam word decides.
    pub fn parse_label(label: &str) -> Option<ScamCategory> {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' || c == '/' { '_' } else { c })
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if normalized.is_empty() {
            return None;
        }

        if let Some(exact) = Self::all().iter().find(|c| c.as_str() == normalized) {
            return Some(*exact);
        }

        let words: Vec<&str> = normalized.split('_').filter(|w| !w.is_empty()).collect();
        let not_legitimate = follows_negation(&words, |w| w.starts_with("legit"));
        let legitimate = !not_legitimate
            && (LEGITIMATE_MARKERS.iter().any(|m| normalized.contains(m))
                || words.iter().any(|w| LEGITIMATE_WORDS.contains(w))
                || follows_negation(&words, |w| {
                    w.starts_with("scam") || scam_alias(w).is_some()
                }));
        if legitimate {
            return Some(ScamCategory::Legitimate);
        }

        SCAM_ALIASES
            .iter()
            .filter_map(|(alias, category)| normalized.find(alias).map(|at| (at, *category)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, category)| category)
    }
}

/// Substrings that mark a non-scam verdict.
const LEGITIMATE_MARKERS: &[&str] = &["legit", "not_a_scam", "no_scam", "non_scam", "benign"];

/// Whole words that mark a non-scam verdict.
const LEGITIMATE_WORDS: &[&str] = &["safe", "normal", "genuine", "harmless"];

const NEGATIONS: &[&str] = &["not", "non", "no"];

const SCAM_ALIASES: &[(&str, ScamCategory)] = &[
    ("financial", ScamCategory::FinancialFraud),
    ("fraud", ScamCategory::FinancialFraud),
    ("investment", ScamCategory::FinancialFraud),
    ("phish", ScamCategory::Phishing),
    ("lottery", ScamCategory::LotteryPrize),
    ("prize", ScamCategory::LotteryPrize),
    ("tech", ScamCategory::TechSupport),
    ("support", ScamCategory::TechSupport),
    ("romance", ScamCategory::Romance),
    ("romantic", ScamCategory::Romance),
];

/// True when a word matching `matches` directly follows a negation.
fn follows_negation(words: &[&str], matches: impl Fn(&str) -> bool) -> bool {
    words
        .windows(2)
        .any(|pair| NEGATIONS.contains(&pair[0]) && matches(pair[1]))
}

fn scam_alias(word: &str) -> Option<ScamCategory> {
    SCAM_ALIASES
        .iter()
        .find(|(alias, _)| word.contains(alias))
        .map(|(_, category)| *category)
}

impl fmt::Display for ScamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scam_categories_exclude_legitimate() {
        assert_eq!(ScamCategory::scam_categories().len(), 5);
        assert!(!ScamCategory::scam_categories().contains(&ScamCategory::Legitimate));
        assert!(ScamCategory::scam_categories().iter().all(|c| c.is_scam()));
    }

    #[test]
    fn serializes_to_snake_case() {
        let json = serde_json::to_string(&ScamCategory::LotteryPrize).unwrap();
        assert_eq!(json, "\"lottery_prize\"");
    }

    #[test]
    fn parse_label_accepts_wire_labels() {
        for category in ScamCategory::all() {
            assert_eq!(ScamCategory::parse_label(category.as_str()), Some(*category));
        }
    }

    #[test]
    fn parse_label_accepts_loose_model_output() {
        assert_eq!(
            ScamCategory::parse_label(" Lottery Prize "),
            Some(ScamCategory::LotteryPrize)
        );
        assert_eq!(
            ScamCategory::parse_label("tech-support"),
            Some(ScamCategory::TechSupport)
        );
        assert_eq!(
            ScamCategory::parse_label("[phishing]"),
            Some(ScamCategory::Phishing)
        );
        assert_eq!(
            ScamCategory::parse_label("Legitimate."),
            Some(ScamCategory::Legitimate)
        );
    }

    #[test]
    fn parse_label_prefers_legitimate_verdicts() {
        for label in [
            "legitimate customer support message",
            "legitimate (no prize involved)",
            "not fraud",
            "Not a scam",
            "not phishing, just a reminder",
            "safe",
        ] {
            assert_eq!(
                ScamCategory::parse_label(label),
                Some(ScamCategory::Legitimate),
                "{label}"
            );
        }
    }

    #[test]
    fn parse_label_takes_earliest_scam_word() {
        assert_eq!(
            ScamCategory::parse_label("phishing with a fake prize"),
            Some(ScamCategory::Phishing)
        );
        assert_eq!(
            ScamCategory::parse_label("lottery fraud"),
            Some(ScamCategory::LotteryPrize)
        );
        assert_eq!(
            ScamCategory::parse_label("unsafe link, phishing"),
            Some(ScamCategory::Phishing)
        );
        assert_eq!(
            ScamCategory::parse_label("tech support, not legitimate"),
            Some(ScamCategory::TechSupport)
        );
    }

    #[test]
    fn parse_label_rejects_garbage() {
        assert_eq!(ScamCategory::parse_label(""), None);
        assert_eq!(ScamCategory::parse_label("banana"), None);
    }

    #[test]
    fn ordering_follows_declaration() {
        assert!(ScamCategory::FinancialFraud < ScamCategory::Phishing);
        assert!(ScamCategory::Romance < ScamCategory::Legitimate);
    }
}
