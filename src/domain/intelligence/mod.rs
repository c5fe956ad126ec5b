//! Intelligence module - artifacts extracted from scam conversations.
//!
//! The pure stages of the extraction pipeline live here; the application
//! layer drives them and performs the optional verification call.

mod artifact;
mod candidates;
mod verification;

pub use artifact::{Artifact, ArtifactDetails, ArtifactSet, ArtifactType, UpsertOutcome};
pub use candidates::{
    bank_name_for_ifsc, is_suspected_phishing, normalize, url_domain, Candidate,
    CandidateExtractor, MatchShape, TextSegment, UNVERIFIED_BONUS, VERIFIED_BONUS,
};
pub use verification::{
    build_verification_prompt, parse_verification_reply, settle_candidates, VerificationStatus,
    VERIFICATION_SYSTEM_PROMPT,
};
