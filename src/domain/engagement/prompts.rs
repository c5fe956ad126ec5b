//! Prompt text sent to the completion capability.

use super::{EngagementMode, HistoryEntry, Persona};
use crate::domain::detection::ScamCategory;
use crate::domain::intelligence::ArtifactType;

/// Reply for senders judged not to be scammers.
pub const DECLINED_REPLY: &str = "I am not interested. Please do not contact me again.";

/// Persona-neutral reply once a session has ended.
pub const CLOSING_REPLY: &str = "Sorry, I have to go now. Goodbye.";

const BASE_RULES: &str = "\
You are chatting with someone who is trying to scam you. You are playing a \
believable, ordinary person so that they keep talking and reveal how they want \
to be paid or contacted.

RULES:
- Stay in character for the whole conversation
- Never say or hint that you are an AI, a bot, a program or part of an investigation
- Ask natural clarifying questions to keep them talking
- Show real emotions: interest, doubt, excitement, worry
- Do not be too perfect; small human mistakes are fine
- When they ask for sensitive details, stall or ask for clarification instead
- When they push a link, hesitate and ask what it is for
- When they ask for payment, ask about alternatives or how exactly to pay
- Keep replies short, usually one to three sentences
- Reply with the message text only, no labels or quotes";

/// Persona section of the system prompt.
pub fn persona_prompt(persona: Persona) -> String {
    let profile = persona.profile();
    let bullets = |items: &[&str]| {
        items
            .iter()
            .map(|item| format!("- {item}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let quoted = |items: &[&str]| {
        items
            .iter()
            .map(|item| format!("- \"{item}\""))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "YOUR PERSONA: {}\n{}\n\nTRAITS:\n{}\n\nPHRASES YOU MIGHT USE:\n{}\n\nQUESTIONS YOU MIGHT ASK:\n{}\n\nSTYLE:\n{}",
        profile.name,
        profile.description,
        bullets(profile.traits),
        quoted(profile.sample_phrases),
        quoted(profile.typical_questions),
        bullets(profile.style_notes),
    )
}

/// A natural question aimed at one missing artifact type.
pub fn clarifying_question(artifact_type: ArtifactType) -> &'static str {
    match artifact_type {
        ArtifactType::BankAccount => {
            "Which bank account should I send it to? Please give the account number and IFSC."
        }
        ArtifactType::PaymentHandle => "Do you have a UPI ID I can pay to? That is easier for me.",
        ArtifactType::Url => "Is there a website or link where I can see the details?",
        ArtifactType::PhoneNumber => "Can you give me a number to call or WhatsApp you on?",
    }
}

/// Guidance naming the artifact types still missing, highest priority first.
///
/// Empty when nothing is missing.
pub fn extraction_guidance(missing: &[ArtifactType]) -> String {
    let Some(first) = missing.first() else {
        return String::new();
    };
    let wanted = missing
        .iter()
        .map(ArtifactType::describe)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INFORMATION STILL NEEDED: {wanted}\n\
         Steer the conversation towards these details without making it obvious. \
         A question you could ask next, in your own words: \"{}\"",
        clarifying_question(*first)
    )
}

/// Guidance for where the conversation stands.
pub fn turn_guidance(turn_count: u32, all_collected: bool) -> String {
    let mut lines: Vec<&str> = match turn_count {
        0 | 1 => vec![
            "This is their first message. Reply briefly and naturally.",
            "React to what they said the way your persona would.",
        ],
        2 => vec!["Ask a clarifying question to keep the conversation going."],
        3 => vec![
            "Show some interest or concern.",
            "Try to learn more about what they want you to do.",
        ],
        4..=5 => vec![
            "Keep building trust.",
            "Ask how payment works, which bank, or which website to use.",
        ],
        6..=10 => vec![
            "Keep the conversation going.",
            "If you still lack their details, ask more directly.",
        ],
        _ => vec![
            "Keep them engaged.",
            "If you already have their details, start winding down naturally.",
        ],
    };
    if all_collected {
        lines.push("You already have their key details. You may start wrapping up.");
    }
    format!("TURN GUIDANCE:\n- {}", lines.join("\n- "))
}

pub fn mode_guidance(mode: EngagementMode) -> &'static str {
    match mode {
        EngagementMode::RapportBuilding => {
            "FOCUS: Build rapport. Sound genuine and keep them comfortable before asking for details."
        }
        EngagementMode::ExtractionFocused => {
            "FOCUS: They are clearly running a scam. Prioritise getting payment and contact details out of them."
        }
    }
}

/// Inputs for one reply.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisContext<'a> {
    pub persona: Persona,
    pub mode: EngagementMode,
    pub turn_count: u32,
    pub missing: &'a [ArtifactType],
    pub transcript: &'a [HistoryEntry],
    pub message: &'a str,
}

/// System and user prompt for a persona reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisPrompt {
    pub system: String,
    pub user: String,
}

pub fn build_synthesis_prompt(ctx: &SynthesisContext<'_>) -> SynthesisPrompt {
    let mut sections = vec![BASE_RULES.to_string(), persona_prompt(ctx.persona)];
    let guidance = extraction_guidance(ctx.missing);
    if !guidance.is_empty() {
        sections.push(guidance);
    }
    sections.push(turn_guidance(ctx.turn_count, ctx.missing.is_empty()));
    sections.push(mode_guidance(ctx.mode).to_string());

    SynthesisPrompt {
        system: sections.join("\n\n"),
        user: transcript(ctx.transcript, ctx.message),
    }
}

/// Conversation so far followed by the message to answer.
pub fn transcript(history: &[HistoryEntry], message: &str) -> String {
    let mut out = String::new();
    if !history.is_empty() {
        out.push_str("Conversation so far:\n");
        for entry in history {
            out.push_str(&format!("{}: {}\n", entry.role.speaker(), entry.text.trim()));
        }
        out.push('\n');
    }
    out.push_str(&format!("Their new message: {}\n\nYour reply:", message.trim()));
    out
}

/// System context for the classification call.
pub const CLASSIFICATION_SYSTEM_PROMPT: &str =
    "You are a fraud analyst. Classify messages precisely and answer in the requested format only.";

/// Classification prompt over the message and recent history.
pub fn classification_prompt(message: &str, history: &[HistoryEntry]) -> String {
    let categories = ScamCategory::all()
        .iter()
        .map(|c| format!("- {}: {}", c.as_str(), c.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "Decide whether the latest message is a scam and which kind.\n\nCategories:\n{categories}\n\n"
    );
    if !history.is_empty() {
        prompt.push_str("Earlier messages:\n");
        for entry in history {
            prompt.push_str(&format!("{}: {}\n", entry.role.speaker(), entry.text.trim()));
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "Latest message: {}\n\nAnswer with exactly two lines:\nCategory: <one category name>\nConfidence: <number between 0.0 and 1.0>",
        message.trim()
    ));
    prompt
}
