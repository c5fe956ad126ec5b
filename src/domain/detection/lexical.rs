//! Lexical signal extraction.
//!
//! Fast, side-effect free keyword and structure scanning. The extractor never
//! fails: text without any hit simply yields an empty analysis.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::ScamCategory;
use crate::domain::foundation::Confidence;

/// Default per-match gain of the saturating score curve.
pub const DEFAULT_SATURATION_RATE: f64 = 0.45;

/// Weight of urgency markers in the overall lexical score.
const URGENCY_WEIGHT: f64 = 0.5;

/// Weight of structural anomalies in the overall lexical score.
const STRUCTURAL_WEIGHT: f64 = 0.3;

/// Short all-caps tokens that are ordinary in payment chatter and must not
/// count as shouting.
const COMMON_ACRONYMS: &[&str] = &[
    "UPI", "ID", "OTP", "ATM", "KYC", "IFSC", "PIN", "CVV", "SBI", "HDFC", "ICICI", "PNB", "RBI",
    "USA", "UK", "AM", "PM", "OK", "SMS", "URL", "PAN", "GST", "INR", "USD",
];

/// What a lexical pattern is evidence of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    FinancialFraud,
    Phishing,
    LotteryPrize,
    TechSupport,
    Romance,
    Urgency,
    AllCapsDemand,
    ExcessiveExclamation,
}

impl PatternCategory {
    /// The scam category this pattern votes for, if any.
    pub fn scam_category(&self) -> Option<ScamCategory> {
        match self {
            PatternCategory::FinancialFraud => Some(ScamCategory::FinancialFraud),
            PatternCategory::Phishing => Some(ScamCategory::Phishing),
            PatternCategory::LotteryPrize => Some(ScamCategory::LotteryPrize),
            PatternCategory::TechSupport => Some(ScamCategory::TechSupport),
            PatternCategory::Romance => Some(ScamCategory::Romance),
            PatternCategory::Urgency
            | PatternCategory::AllCapsDemand
            | PatternCategory::ExcessiveExclamation => None,
        }
    }

    /// True for shouting and punctuation anomalies.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PatternCategory::AllCapsDemand | PatternCategory::ExcessiveExclamation
        )
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("lexical pattern must compile")
}

static VOCABULARY: Lazy<Vec<(PatternCategory, Regex)>> = Lazy::new(|| {
    vec![
        (
            PatternCategory::Urgency,
            compile(r"(?i)\b(?:urgent|urgently|immediately|right now|asap|today only|limited time|act now|don't wait|hurry|within 24 hours)\b"),
        ),
        (
            PatternCategory::Urgency,
            compile(r"(?i)\b(?:expiring|expires soon|last chance|final notice|deadline|time is running out|will be blocked|will be suspended)\b"),
        ),
        (
            PatternCategory::FinancialFraud,
            compile(r"(?i)\b(?:bank account|account number|ifsc(?: code)?|wire transfer|transfer|deposit|payment|money|cash|rupees|upi(?: id)?)\b"),
        ),
        (
            PatternCategory::FinancialFraud,
            compile(r"(?i)\b(?:investment|profit|double your|guaranteed|risk[- ]free|scheme)\b"),
        ),
        (
            PatternCategory::FinancialFraud,
            compile(r"(?i)\b(?:advance fee|registration fee|processing fee|security deposit|tax fee|clearance fee)\b"),
        ),
        (
            PatternCategory::FinancialFraud,
            compile(r"(?i)(?:\brs\.?\s?\d|₹\s?\d|\binr\s?\d)"),
        ),
        (
            PatternCategory::Phishing,
            compile(r"(?i)\b(?:click here|click the link|verify|confirm|update your|log ?in|sign in|account (?:suspended|blocked|locked)|security alert|kyc)\b"),
        ),
        (
            PatternCategory::Phishing,
            compile(r"(?i)\b(?:password|otp|pin|cvv|card number|credit card|debit card)\b"),
        ),
        (
            PatternCategory::Phishing,
            compile(r"(?i)https?://\S*(?:verify|secure|login|account|bank|update)\S*"),
        ),
        (
            PatternCategory::LotteryPrize,
            compile(r"(?i)\b(?:lottery|prize|winner|won|jackpot|lucky draw|reward|gift)\b"),
        ),
        (
            PatternCategory::LotteryPrize,
            compile(r"(?i)\b(?:claim|collect|receive your|congratulations|congrats|you have been selected|you(?:'|’)?ve been selected|you(?:'|’)?ve won|you have won)\b"),
        ),
        (
            PatternCategory::TechSupport,
            compile(r"(?i)\b(?:virus|malware|hacked|hack|security breach|compromised|suspicious activity)\b"),
        ),
        (
            PatternCategory::TechSupport,
            compile(r"(?i)\b(?:remote access|teamviewer|anydesk|technician|tech support|technical support|customer support|microsoft|apple support)\b"),
        ),
        (
            PatternCategory::Romance,
            compile(r"(?i)\b(?:my love|my dear|sweetheart|darling|help me|emergency|hospital|sick|family problem)\b"),
        ),
        (
            PatternCategory::Romance,
            compile(r"(?i)\b(?:gift card|bitcoin|crypto|western union|moneygram|money transfer)\b"),
        ),
    ]
});

static ALL_CAPS_RUN: Lazy<Regex> = Lazy::new(|| compile(r"\b[A-Z]{2,}(?:[ \t]+[A-Z]{2,})+\b"));

static EXCLAMATION_RUN: Lazy<Regex> = Lazy::new(|| compile(r"!{2,}"));

/// One pattern hit inside the scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalMatch {
    pub pattern: PatternCategory,
    /// Matched text as it appeared.
    pub span: String,
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
}

/// A `(pattern-category, matched-span, base-score)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalSignal {
    pub pattern: PatternCategory,
    pub span: String,
    pub base_score: Confidence,
}

/// Result of scanning one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexicalAnalysis {
    matches: Vec<LexicalMatch>,
    scores: BTreeMap<PatternCategory, Confidence>,
}

impl LexicalAnalysis {
    /// All raw matches in text order.
    pub fn matches(&self) -> &[LexicalMatch] {
        &self.matches
    }

    /// True when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Base score of a pattern category (zero when it never matched).
    pub fn score(&self, pattern: PatternCategory) -> Confidence {
        self.scores.get(&pattern).copied().unwrap_or(Confidence::ZERO)
    }

    /// One triple per match, carrying its category's base score.
    pub fn signals(&self) -> Vec<LexicalSignal> {
        self.matches
            .iter()
            .map(|m| LexicalSignal {
                pattern: m.pattern,
                span: m.span.clone(),
                base_score: self.score(m.pattern),
            })
            .collect()
    }

    /// Lexical evidence for a scam category.
    pub fn category_score(&self, category: ScamCategory) -> Confidence {
        self.scores
            .iter()
            .find(|(pattern, _)| pattern.scam_category() == Some(category))
            .map(|(_, score)| *score)
            .unwrap_or(Confidence::ZERO)
    }

    /// Lexical evidence for every scam category that matched at least once.
    pub fn category_scores(&self) -> BTreeMap<ScamCategory, Confidence> {
        self.scores
            .iter()
            .filter_map(|(pattern, score)| pattern.scam_category().map(|c| (c, *score)))
            .collect()
    }

    /// Overall lexical scam score.
    ///
    /// Noisy-OR over the category scores, with urgency and structural
    /// anomalies contributing at reduced weight. Monotone in every input.
    pub fn scam_score(&self) -> Confidence {
        let mut not_scam = 1.0;
        for (pattern, score) in &self.scores {
            let weight = if pattern.scam_category().is_some() {
                1.0
            } else if *pattern == PatternCategory::Urgency {
                URGENCY_WEIGHT
            } else {
                STRUCTURAL_WEIGHT
            };
            not_scam *= 1.0 - weight * score.value();
        }
        Confidence::clamped(1.0 - not_scam)
    }

    /// Distinct matched phrases (lowercased, first-occurrence order).
    ///
    /// Structural matches are excluded; they are not keywords.
    pub fn suspicious_keywords(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.matches
            .iter()
            .filter(|m| !m.pattern.is_structural())
            .map(|m| m.span.trim().to_lowercase())
            .filter(|k| seen.insert(k.clone()))
            .collect()
    }
}

/// Saturating base score for `count` matches: `1 - (1 - rate)^count`.
///
/// The first few matches move the score quickly; repeats of trivial hits
/// cannot push it past 1.
pub fn saturating_score(count: usize, rate: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let rate = rate.clamp(0.0, 1.0);
    1.0 - (1.0 - rate).powi(count.min(i32::MAX as usize) as i32)
}

/// Keyword and structure scanner.
#[derive(Debug, Clone)]
pub struct LexicalSignalExtractor {
    saturation_rate: f64,
}

impl Default for LexicalSignalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalSignalExtractor {
    /// Creates an extractor with the default saturation curve.
    pub fn new() -> Self {
        Self {
            saturation_rate: DEFAULT_SATURATION_RATE,
        }
    }

    /// Scans `text` and scores every pattern category that matched.
    pub fn analyze(&self, text: &str) -> LexicalAnalysis {
        let mut matches = Vec::new();

        for (pattern, regex) in VOCABULARY.iter() {
            for m in regex.find_iter(text) {
                matches.push(LexicalMatch {
                    pattern: *pattern,
                    span: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                });
            }
        }

        for m in ALL_CAPS_RUN.find_iter(text) {
            let shouted = m
                .as_str()
                .split_whitespace()
                .filter(|word| !COMMON_ACRONYMS.contains(word))
                .count();
            if shouted >= 2 {
                matches.push(LexicalMatch {
                    pattern: PatternCategory::AllCapsDemand,
                    span: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                });
            }
        }

        for m in EXCLAMATION_RUN.find_iter(text) {
            matches.push(LexicalMatch {
                pattern: PatternCategory::ExcessiveExclamation,
                span: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }

        matches.sort_by_key(|m| (m.start, m.end));

        // Repeated identical phrases count once per category.
        let mut distinct: BTreeMap<PatternCategory, HashSet<String>> = BTreeMap::new();
        for m in &matches {
            distinct
                .entry(m.pattern)
                .or_default()
                .insert(m.span.to_lowercase());
        }
        let scores = distinct
            .into_iter()
            .map(|(pattern, spans)| {
                let score = saturating_score(spans.len(), self.saturation_rate);
                (pattern, Confidence::clamped(score))
            })
            .collect();

        LexicalAnalysis { matches, scores }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> LexicalAnalysis {
        LexicalSignalExtractor::new().analyze(text)
    }

    mod saturation {
        use super::*;

        #[test]
        fn zero_matches_scores_zero() {
            assert_eq!(saturating_score(0, DEFAULT_SATURATION_RATE), 0.0);
        }

        #[test]
        fn gains_diminish_after_first_matches() {
            let s1 = saturating_score(1, DEFAULT_SATURATION_RATE);
            let s2 = saturating_score(2, DEFAULT_SATURATION_RATE);
            let s3 = saturating_score(3, DEFAULT_SATURATION_RATE);
            let s10 = saturating_score(10, DEFAULT_SATURATION_RATE);
            assert!(s2 - s1 > s3 - s2);
            assert!(s10 < 1.0);
            assert!(s10 > 0.99);
        }

        #[test]
        fn huge_counts_stay_bounded() {
            let s = saturating_score(usize::MAX, DEFAULT_SATURATION_RATE);
            assert!(s <= 1.0);
        }
    }

    mod vocabulary {
        use super::*;

        #[test]
        fn plain_message_yields_empty_analysis() {
            let analysis = analyze("See you at the meeting tomorrow");
            assert!(analysis.is_empty());
            assert_eq!(analysis.scam_score(), Confidence::ZERO);
        }

        #[test]
        fn empty_text_is_not_an_error() {
            assert!(analyze("").is_empty());
        }

        #[test]
        fn lottery_message_favours_lottery_category() {
            let analysis =
                analyze("Congratulations! You've won Rs. 50,000... UPI ID: winner@paytm");
            let lottery = analysis.category_score(ScamCategory::LotteryPrize);
            let financial = analysis.category_score(ScamCategory::FinancialFraud);
            assert!(lottery > financial, "lottery={lottery} financial={financial}");
            assert!(analysis.scam_score().value() > 0.8);
        }

        #[test]
        fn matching_is_case_insensitive() {
            let upper = analyze("URGENT: VERIFY your account");
            let lower = analyze("urgent: verify your account");
            assert_eq!(
                upper.score(PatternCategory::Urgency),
                lower.score(PatternCategory::Urgency)
            );
            assert!(upper.score(PatternCategory::Phishing).value() > 0.0);
        }

        #[test]
        fn punctuation_does_not_hide_keywords() {
            let analysis = analyze("...(lottery)!!");
            assert!(analysis.category_score(ScamCategory::LotteryPrize).value() > 0.0);
        }

        #[test]
        fn tech_support_vocabulary_is_detected() {
            let analysis = analyze("Your computer has a virus, install AnyDesk for remote access");
            let scores = analysis.category_scores();
            assert!(scores.contains_key(&ScamCategory::TechSupport));
        }

        #[test]
        fn repeated_trivial_hit_counts_once() {
            let once = analyze("prize");
            let many = analyze("prize prize prize prize prize");
            assert_eq!(
                once.category_score(ScamCategory::LotteryPrize),
                many.category_score(ScamCategory::LotteryPrize)
            );
        }
    }

    mod structure {
        use super::*;

        #[test]
        fn shouted_demand_is_structural_anomaly() {
            let analysis = analyze("SEND MONEY NOW or lose everything");
            assert!(analysis.score(PatternCategory::AllCapsDemand).value() > 0.0);
        }

        #[test]
        fn payment_acronyms_are_not_shouting() {
            let analysis = analyze("share UPI ID please");
            assert_eq!(analysis.score(PatternCategory::AllCapsDemand), Confidence::ZERO);
        }

        #[test]
        fn exclamation_runs_are_flagged() {
            let analysis = analyze("Reply fast!!!");
            assert!(analysis.score(PatternCategory::ExcessiveExclamation).value() > 0.0);
            let single = analyze("Hello!");
            assert_eq!(
                single.score(PatternCategory::ExcessiveExclamation),
                Confidence::ZERO
            );
        }
    }

    mod outputs {
        use super::*;

        #[test]
        fn signals_carry_category_base_score() {
            let analysis = analyze("urgent payment");
            let signals = analysis.signals();
            assert_eq!(signals.len(), 2);
            for signal in signals {
                assert_eq!(signal.base_score, analysis.score(signal.pattern));
            }
        }

        #[test]
        fn suspicious_keywords_are_distinct_and_lowercase() {
            let analysis = analyze("OTP please. Share the otp now!!");
            let keywords = analysis.suspicious_keywords();
            assert_eq!(keywords.iter().filter(|k| *k == "otp").count(), 1);
            assert!(!keywords.iter().any(|k| k.contains('!')));
        }

        #[test]
        fn urgency_alone_scores_below_category_hit() {
            let urgency = analyze("hurry");
            let category = analyze("lottery");
            assert!(urgency.scam_score() < category.scam_score());
        }
    }
}
