//! Candidate extraction, contextual validation and scoring.
//!
//! Stages one, two and four of the extraction pipeline. Everything here is
//! pure: malformed or contradicted candidates are dropped, never raised.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Artifact, ArtifactDetails, ArtifactType};
use crate::domain::foundation::{Confidence, TurnSequence};

/// Contextual relevance when a supporting keyword is nearby.
const CONTEXT_SUPPORTED: f64 = 0.3;

/// Contextual relevance with no supporting keyword.
const CONTEXT_UNSUPPORTED: f64 = 0.1;

/// Bytes scanned before a candidate for supporting keywords.
const CONTEXT_WINDOW_BEFORE: usize = 48;

/// Bytes scanned after a candidate for supporting keywords.
const CONTEXT_WINDOW_AFTER: usize = 24;

/// Verification component for a model-confirmed candidate.
pub const VERIFIED_BONUS: f64 = 0.4;

/// Verification component when no verdict was obtained.
pub const UNVERIFIED_BONUS: f64 = 0.15;

const PAYMENT_PROVIDERS: &str = "paytm|gpay|phonepe|ybl|okaxis|okhdfcbank|okicici|oksbi|axl|ibl|apl|axis|icici|hdfc|sbi|kotak|upi";

const URL_SHORTENERS: &[&str] = &["bit.ly", "tinyurl.com", "goo.gl", "t.co", "short.link"];

const PHISHING_INDICATORS: &[&str] = &[
    "verify", "secure", "login", "account", "bank", "update", "confirm", "support", "help",
    "service", "customer", "official", "genuine", "bit.ly", "tinyurl", "short.link", "goo.gl",
    "t.co",
];

const BANK_CODES: &[(&str, &str)] = &[
    ("HDFC", "HDFC Bank"),
    ("ICIC", "ICICI Bank"),
    ("SBIN", "State Bank of India"),
    ("AXIS", "Axis Bank"),
    ("UTIB", "Axis Bank"),
    ("KKBK", "Kotak Mahindra Bank"),
    ("PUNB", "Punjab National Bank"),
    ("UBIN", "Union Bank of India"),
    ("BKID", "Bank of India"),
    ("BARB", "Bank of Baroda"),
    ("CNRB", "Canara Bank"),
];

/// Markers that turn a following number into an amount, code or reference.
const NUMBER_VETO_MARKERS: &[&str] = &[
    "rs", "rs.", "₹", "inr", "otp", "ref", "ref no", "reference", "order", "order id", "txn",
    "transaction id", "invoice", "code", "pin", "amount",
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("extraction pattern must compile")
}

static BANK_ACCOUNT: Lazy<Regex> = Lazy::new(|| compile(r"\b\d{9,18}\b"));

static PAYMENT_HANDLE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"(?i)\b[a-z0-9][a-z0-9._-]*@(?:{})\b",
        PAYMENT_PROVIDERS
    ))
});

static URL_WITH_SCHEME: Lazy<Regex> = Lazy::new(|| compile(r#"(?i)\bhttps?://[^\s<>"']+"#));

static URL_WWW: Lazy<Regex> = Lazy::new(|| compile(r#"(?i)\bwww\.[^\s<>"']+"#));

static URL_SHORTENED: Lazy<Regex> = Lazy::new(|| {
    compile(r#"(?i)\b(?:bit\.ly|tinyurl\.com|goo\.gl|t\.co|short\.link)/[^\s<>"']+"#)
});

static URL_BARE_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    compile(
        r#"(?i)\b[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.(?:com|in|net|org|info|xyz|co|io|biz|online|site|top|me|app|link|club|live)\b(?:/[^\s<>"']*)?"#,
    )
});

static PHONE_INDIAN: Lazy<Regex> =
    Lazy::new(|| compile(r"(?:\+91[\s-]?|\b)[6-9]\d{4}[\s-]?\d{5}\b"));

static PHONE_INTERNATIONAL: Lazy<Regex> =
    Lazy::new(|| compile(r"\+\d{1,3}(?:[\s-]?\d){7,12}\b"));

static IFSC_CODE: Lazy<Regex> = Lazy::new(|| compile(r"\b[A-Z]{4}0[A-Z0-9]{6}\b"));

static IFSC_LABELLED: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\bifsc(?:\s*code)?\s*[:\-]?\s*([a-z]{4}0[a-z0-9]{6})\b")
});

/// How the candidate was recognised; drives pattern quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchShape {
    AccountNumber,
    ProviderHandle,
    SchemeUrl,
    WwwUrl,
    ShortenedUrl,
    BareDomain,
    IndianMobile,
    InternationalPhone,
}

impl MatchShape {
    fn artifact_type(&self) -> ArtifactType {
        match self {
            MatchShape::AccountNumber => ArtifactType::BankAccount,
            MatchShape::ProviderHandle => ArtifactType::PaymentHandle,
            MatchShape::SchemeUrl
            | MatchShape::WwwUrl
            | MatchShape::ShortenedUrl
            | MatchShape::BareDomain => ArtifactType::Url,
            MatchShape::IndianMobile | MatchShape::InternationalPhone => ArtifactType::PhoneNumber,
        }
    }
}

/// A raw span that looks like an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub artifact_type: ArtifactType,
    pub shape: MatchShape,
    /// Span as it appeared in the text.
    pub raw: String,
    pub normalized: String,
    pub start: usize,
    pub end: usize,
    /// Turn the scanned text belongs to.
    pub turn: TurnSequence,
    /// Pattern quality in [0, 0.3].
    pub pattern_quality: f64,
    /// Contextual relevance in [0, 0.3].
    pub context_relevance: f64,
    pub details: ArtifactDetails,
}

impl Candidate {
    /// Score before semantic verification.
    pub fn pre_verification_score(&self) -> f64 {
        self.pattern_quality + self.context_relevance
    }

    /// Final confidence given the verification outcome.
    pub fn score(&self, verified: bool) -> Confidence {
        let verification = if verified {
            VERIFIED_BONUS
        } else {
            UNVERIFIED_BONUS
        };
        Confidence::clamped(self.pre_verification_score() + verification)
    }

    fn overlaps(&self, other: &Candidate) -> bool {
        self.turn == other.turn && self.start < other.end && other.start < self.end
    }

    /// Converts into an artifact once verification is settled.
    pub fn into_artifact(self, verified: bool) -> Artifact {
        let confidence = self.score(verified);
        Artifact::new(self.artifact_type, self.normalized, confidence, self.turn)
            .verified(verified)
            .with_details(self.details)
    }
}

/// One piece of text to scan, tagged with the turn it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub turn: TurnSequence,
    pub text: String,
}

impl TextSegment {
    pub fn new(turn: TurnSequence, text: impl Into<String>) -> Self {
        Self {
            turn,
            text: text.into(),
        }
    }
}

/// Regex extraction plus contextual validation.
#[derive(Debug, Clone, Default)]
pub struct CandidateExtractor;

impl CandidateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Runs extraction and validation over every segment.
    ///
    /// Overlapping candidates within a segment are resolved by keeping the
    /// higher-scoring one; the same normalized value seen in several
    /// segments is kept once, at its earliest turn.
    pub fn extract(&self, segments: &[TextSegment]) -> Vec<Candidate> {
        let mut kept: Vec<Candidate> = Vec::new();
        for segment in segments {
            for candidate in resolve_overlaps(validate(raw_candidates(segment), &segment.text)) {
                match kept.iter_mut().find(|k| {
                    k.artifact_type == candidate.artifact_type
                        && k.normalized == candidate.normalized
                }) {
                    Some(existing) => {
                        if candidate.pre_verification_score() > existing.pre_verification_score()
                        {
                            let turn = existing.turn.min(candidate.turn);
                            *existing = Candidate { turn, ..candidate };
                        } else {
                            existing.turn = existing.turn.min(candidate.turn);
                        }
                    }
                    None => kept.push(candidate),
                }
            }
        }
        kept
    }
}

fn raw_candidates(segment: &TextSegment) -> Vec<Candidate> {
    let text = segment.text.as_str();
    let shapes: [(&Lazy<Regex>, MatchShape); 8] = [
        (&BANK_ACCOUNT, MatchShape::AccountNumber),
        (&PAYMENT_HANDLE, MatchShape::ProviderHandle),
        (&URL_WITH_SCHEME, MatchShape::SchemeUrl),
        (&URL_WWW, MatchShape::WwwUrl),
        (&URL_SHORTENED, MatchShape::ShortenedUrl),
        (&URL_BARE_DOMAIN, MatchShape::BareDomain),
        (&PHONE_INDIAN, MatchShape::IndianMobile),
        (&PHONE_INTERNATIONAL, MatchShape::InternationalPhone),
    ];

    let ifsc = find_ifsc(text);
    let mut out = Vec::new();
    for (regex, shape) in shapes {
        for m in regex.find_iter(text) {
            let raw = if shape.artifact_type() == ArtifactType::Url {
                m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']'])
            } else {
                m.as_str()
            };
            if raw.is_empty() {
                continue;
            }
            let Some(normalized) = normalize(shape, raw) else {
                continue;
            };
            let details = details_for(shape, &normalized, ifsc.as_deref());
            out.push(Candidate {
                artifact_type: shape.artifact_type(),
                shape,
                raw: raw.to_string(),
                pattern_quality: pattern_quality(shape, &normalized),
                normalized,
                start: m.start(),
                end: m.start() + raw.len(),
                turn: segment.turn,
                context_relevance: 0.0,
                details,
            });
        }
    }
    out
}

fn validate(candidates: Vec<Candidate>, text: &str) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| !is_contradicted(c, text))
        .map(|mut c| {
            c.context_relevance = if has_supporting_keyword(c.artifact_type, text, c.start, c.end)
            {
                CONTEXT_SUPPORTED
            } else {
                CONTEXT_UNSUPPORTED
            };
            c
        })
        .collect()
}

fn resolve_overlaps(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.pre_verification_score()
            .total_cmp(&a.pre_verification_score())
            .then(a.start.cmp(&b.start))
    });
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if !kept.iter().any(|k| k.overlaps(&candidate)) {
            kept.push(candidate);
        }
    }
    kept.sort_by_key(|c| c.start);
    kept
}

fn char_before(text: &str, index: usize) -> Option<char> {
    text.get(..index).and_then(|s| s.chars().next_back())
}

fn char_after(text: &str, index: usize) -> Option<char> {
    text.get(index..).and_then(|s| s.chars().next())
}

fn is_contradicted(candidate: &Candidate, text: &str) -> bool {
    let before = char_before(text, candidate.start);
    let after = char_after(text, candidate.end);
    let after_next = text
        .get(candidate.end..)
        .and_then(|s| s.chars().nth(1));

    match candidate.artifact_type {
        ArtifactType::BankAccount | ArtifactType::PhoneNumber => {
            // Part of a date, decimal or longer dotted/dashed token.
            let joined_before = matches!(before, Some('/' | '-' | '.' | ','))
                && char_before(text, candidate.start - 1).is_some_and(|c| c.is_ascii_digit());
            let joined_after = matches!(after, Some('/' | '-' | '.' | ','))
                && after_next.is_some_and(|c| c.is_ascii_digit());
            joined_before || joined_after || preceded_by_veto_marker(text, candidate.start)
        }
        ArtifactType::PaymentHandle => {
            // "name@axis.com" is an e-mail address, not a handle.
            after == Some('.') && after_next.is_some_and(|c| c.is_ascii_alphabetic())
        }
        ArtifactType::Url => {
            candidate.shape == MatchShape::BareDomain && matches!(before, Some('@' | '.'))
        }
    }
}

fn preceded_by_veto_marker(text: &str, start: usize) -> bool {
    let prefix = text.get(..start).unwrap_or_default().to_lowercase();
    let prefix = prefix.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '#' | '-' | '='));
    NUMBER_VETO_MARKERS.iter().any(|marker| {
        prefix.ends_with(marker)
            && prefix[..prefix.len() - marker.len()]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric())
    })
}

fn supporting_keywords(artifact_type: ArtifactType) -> &'static [&'static str] {
    match artifact_type {
        ArtifactType::BankAccount => &[
            "account", "a/c", "acc", "bank", "ifsc", "transfer", "deposit", "neft", "imps",
            "beneficiary",
        ],
        ArtifactType::PaymentHandle => &[
            "upi", "pay", "send", "transfer", "gpay", "phonepe", "paytm", "vpa",
        ],
        ArtifactType::Url => &[
            "link", "click", "visit", "website", "site", "open", "login", "verify", "portal",
        ],
        ArtifactType::PhoneNumber => &[
            "call", "phone", "mobile", "whatsapp", "contact", "reach", "sms", "text", "dial",
        ],
    }
}

fn has_supporting_keyword(artifact_type: ArtifactType, text: &str, start: usize, end: usize) -> bool {
    let from = floor_char_boundary(text, start.saturating_sub(CONTEXT_WINDOW_BEFORE));
    let to = ceil_char_boundary(text, (end + CONTEXT_WINDOW_AFTER).min(text.len()));
    let before = text.get(from..start).unwrap_or_default().to_lowercase();
    let after = text.get(end..to).unwrap_or_default().to_lowercase();
    supporting_keywords(artifact_type)
        .iter()
        .any(|k| before.contains(k) || after.contains(k))
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

fn pattern_quality(shape: MatchShape, normalized: &str) -> f64 {
    match shape {
        MatchShape::AccountNumber => {
            let looks_like_mobile = normalized.len() == 10
                && normalized.starts_with(['6', '7', '8', '9']);
            if looks_like_mobile {
                0.05
            } else if normalized.len() >= 11 {
                0.25
            } else {
                0.15
            }
        }
        MatchShape::ProviderHandle => 0.3,
        MatchShape::SchemeUrl | MatchShape::ShortenedUrl => 0.3,
        MatchShape::WwwUrl => 0.25,
        MatchShape::BareDomain => 0.15,
        MatchShape::IndianMobile => 0.3,
        MatchShape::InternationalPhone => 0.2,
    }
}

/// Canonical form of a raw span, or `None` when it cannot be normalized.
pub fn normalize(shape: MatchShape, raw: &str) -> Option<String> {
    match shape.artifact_type() {
        ArtifactType::BankAccount => {
            let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
            (9..=18).contains(&digits.len()).then_some(digits)
        }
        ArtifactType::PaymentHandle => {
            let handle = raw.trim().to_lowercase();
            let (user, provider) = handle.split_once('@')?;
            (!user.is_empty() && !provider.is_empty()).then_some(handle)
        }
        ArtifactType::Url => normalize_url(raw),
        ArtifactType::PhoneNumber => normalize_phone(raw),
    }
}

fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme.to_lowercase(), rest),
        None => ("https".to_string(), trimmed),
    };
    let (host, path) = match rest.find(['/', '?', '#']) {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    if host.is_empty() || !host.contains('.') {
        return None;
    }
    Some(format!("{}://{}{}", scheme, host.to_lowercase(), path))
}

fn normalize_phone(raw: &str) -> Option<String> {
    let has_plus = raw.trim_start().starts_with('+');
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let is_mobile = |d: &str| d.len() == 10 && d.starts_with(['6', '7', '8', '9']);

    if !has_plus && is_mobile(&digits) {
        return Some(format!("+91{}", digits));
    }
    if !has_plus && digits.len() == 12 && digits.starts_with("91") && is_mobile(&digits[2..]) {
        return Some(format!("+{}", digits));
    }
    if has_plus && (8..=15).contains(&digits.len()) {
        return Some(format!("+{}", digits));
    }
    None
}

/// Host part of a normalized URL, without port.
pub fn url_domain(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    host.split(':').next().unwrap_or(host).to_string()
}

/// True when the URL contains a known phishing indicator or shortener.
pub fn is_suspected_phishing(url: &str) -> bool {
    let lower = url.to_lowercase();
    PHISHING_INDICATORS.iter().any(|i| lower.contains(i))
        || URL_SHORTENERS.iter().any(|s| url_domain(&lower) == *s)
}

/// Bank name for an IFSC code, from its four-letter prefix.
pub fn bank_name_for_ifsc(ifsc: &str) -> Option<&'static str> {
    let prefix = ifsc.get(..4)?.to_uppercase();
    BANK_CODES
        .iter()
        .find(|(code, _)| *code == prefix)
        .map(|(_, name)| *name)
}

fn find_ifsc(text: &str) -> Option<String> {
    IFSC_LABELLED
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
        .or_else(|| IFSC_CODE.find(text).map(|m| m.as_str().to_string()))
}

fn details_for(shape: MatchShape, normalized: &str, ifsc: Option<&str>) -> ArtifactDetails {
    match shape.artifact_type() {
        ArtifactType::BankAccount => ArtifactDetails {
            ifsc_code: ifsc.map(str::to_string),
            bank_name: ifsc.and_then(bank_name_for_ifsc).map(str::to_string),
            ..Default::default()
        },
        ArtifactType::PaymentHandle => ArtifactDetails {
            provider: normalized.split_once('@').map(|(_, p)| p.to_string()),
            ..Default::default()
        },
        ArtifactType::Url => ArtifactDetails {
            domain: Some(url_domain(normalized)),
            suspected_phishing: is_suspected_phishing(normalized),
            ..Default::default()
        },
        ArtifactType::PhoneNumber => ArtifactDetails::default(),
    }
}
