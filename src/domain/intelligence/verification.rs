//! Semantic verification of extracted candidates.
//!
//! One completion call covers every candidate of a turn. The model answers
//! with a JSON array; anything it does not answer about stays unverified.

use serde::Deserialize;

use super::candidates::Candidate;
use super::Artifact;

/// System context for the verification call.
pub const VERIFICATION_SYSTEM_PROMPT: &str = "You check whether strings extracted from a chat \
message are genuine payment or contact details. Reply with a JSON array only.";

/// Outcome for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Confirmed,
    Rejected,
    Unverified,
}

/// The model's `normalized` field is accepted but not trusted; values are
/// always normalized locally.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    index: usize,
    valid: bool,
}

/// Builds the prompt listing every candidate with its index.
pub fn build_verification_prompt(candidates: &[Candidate], message: &str) -> String {
    let mut prompt = String::from("Message:\n");
    prompt.push_str(message);
    prompt.push_str("\n\nCandidates:\n");
    for (index, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. [{}] {}\n",
            index, candidate.artifact_type, candidate.raw
        ));
    }
    prompt.push_str(
        "\nFor each candidate decide whether, in this message, it really is the stated kind of \
         detail. Answer with a JSON array of objects \
         {\"index\": <number>, \"valid\": <true|false>, \"normalized\": <string or null>}.",
    );
    prompt
}

/// Parses the verification reply into one status per candidate.
///
/// Returns `None` when the reply holds no JSON array; callers then leave
/// every candidate unverified. Out-of-range indices are ignored.
pub fn parse_verification_reply(reply: &str, count: usize) -> Option<Vec<VerificationStatus>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end < start {
        return None;
    }
    let verdicts: Vec<RawVerdict> = serde_json::from_str(&reply[start..=end]).ok()?;

    let mut statuses = vec![VerificationStatus::Unverified; count];
    for verdict in verdicts {
        if let Some(slot) = statuses.get_mut(verdict.index) {
            *slot = if verdict.valid {
                VerificationStatus::Confirmed
            } else {
                VerificationStatus::Rejected
            };
        }
    }
    Some(statuses)
}

/// Applies verification outcomes and scores the survivors.
///
/// Rejected candidates are dropped; a missing or short status list leaves
/// the remaining candidates unverified.
pub fn settle_candidates(
    candidates: Vec<Candidate>,
    statuses: Option<&[VerificationStatus]>,
) -> Vec<Artifact> {
    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let status = statuses
                .and_then(|s| s.get(index))
                .copied()
                .unwrap_or(VerificationStatus::Unverified);
            match status {
                VerificationStatus::Rejected => None,
                VerificationStatus::Confirmed => Some(candidate.into_artifact(true)),
                VerificationStatus::Unverified => Some(candidate.into_artifact(false)),
            }
        })
        .collect()
}
