//! Reply cleanup and character-consistency checks.

use std::collections::HashSet;

/// Phrases that give away a synthetic speaker.
const DISCLOSURE_MARKERS: &[&str] = &[
    "as an ai",
    "an ai language model",
    "language model",
    "i am an ai",
    "i'm an ai",
    "artificial intelligence",
    "chatbot",
    "i am a bot",
    "i'm a bot",
    "honeypot",
    "honey-pot",
    "honey pot",
    "scam detection",
    "this conversation is being monitored",
    "i cannot roleplay",
    "openai",
];

const ROLE_PREFIXES: &[&str] = &["Response:", "Reply:", "You:", "AI:", "Assistant:"];

/// Why a reply was not accepted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCheck {
    Accepted,
    Empty,
    DisclosesIdentity,
    Repetitive,
}

/// Strips wrapping quotes and role prefixes and ensures terminal punctuation.
pub fn clean_reply(raw: &str) -> String {
    let mut reply = raw.trim();

    for quote in ['"', '\''] {
        if reply.len() >= 2 && reply.starts_with(quote) && reply.ends_with(quote) {
            reply = reply[1..reply.len() - 1].trim();
        }
    }

    loop {
        let Some(prefix) = ROLE_PREFIXES.iter().find(|p| {
            reply
                .get(..p.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(p))
        }) else {
            break;
        };
        reply = reply[prefix.len()..].trim_start();
    }

    let mut cleaned = reply.trim().to_string();
    if !cleaned.is_empty() && !cleaned.ends_with(['.', '!', '?']) {
        cleaned.push('.');
    }
    cleaned
}

/// True when the reply admits to being synthetic.
pub fn discloses_synthetic_identity(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    DISCLOSURE_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity of the two texts' lowercase word sets.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a = word_set(a);
    let b = word_set(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(&b).count() as f64;
    let union = a.union(&b).count() as f64;
    intersection / union
}

/// Runs every consistency check against the recent outbound replies.
pub fn check_reply(reply: &str, recent_outbound: &[String], similarity_threshold: f64) -> ReplyCheck {
    if reply.trim().is_empty() {
        return ReplyCheck::Empty;
    }
    if discloses_synthetic_identity(reply) {
        return ReplyCheck::DisclosesIdentity;
    }
    if recent_outbound
        .iter()
        .any(|previous| jaccard_similarity(reply, previous) > similarity_threshold)
    {
        return ReplyCheck::Repetitive;
    }
    ReplyCheck::Accepted
}
