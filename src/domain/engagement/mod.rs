//! Engagement module - the conversation state machine and persona replies.
//!
//! - `state` - detection lifecycle, engagement mode, termination reasons
//! - `session` - the per-conversation aggregate
//! - `persona` - personas and the category → persona policy
//! - `prompts` / `consistency` - reply synthesis text and checks

mod consistency;
mod persona;
mod prompts;
mod session;
mod state;
mod turn;

pub use consistency::{
    check_reply, clean_reply, discloses_synthetic_identity, jaccard_similarity, ReplyCheck,
};
pub use persona::{Persona, PersonaPolicy, PersonaProfile};
pub use prompts::{
    build_synthesis_prompt, clarifying_question, classification_prompt, extraction_guidance,
    mode_guidance, persona_prompt, transcript, turn_guidance, SynthesisContext, SynthesisPrompt,
    CLASSIFICATION_SYSTEM_PROMPT, CLOSING_REPLY, DECLINED_REPLY,
};
pub use session::{
    DetectionThresholds, EngagementLimits, Evaluation, Session, MAX_TIME_BUDGET_SECS,
};
pub use state::{DetectionState, EngagementMode, TerminationReason};
pub use turn::{HistoryEntry, Turn, TurnRole};
