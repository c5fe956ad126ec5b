//! Personas the engine can adopt and the category → persona policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::detection::ScamCategory;

/// Engagement strategy presented to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Elderly,
    JobSeeker,
    LotteryWinner,
}

/// Static description of a persona, used to build prompts and fillers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonaProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub traits: &'static [&'static str],
    pub sample_phrases: &'static [&'static str],
    pub typical_questions: &'static [&'static str],
    pub style_notes: &'static [&'static str],
    /// Short in-character replies used when generation fails.
    pub fillers: &'static [&'static str],
}

const ELDERLY: PersonaProfile = PersonaProfile {
    name: "Elderly Person",
    description: "A retired person in their late sixties who is not comfortable with technology",
    traits: &[
        "Needs technical instructions repeated slowly",
        "Asks how each step works before doing it",
        "Worries about losing savings",
        "Relies on a grandson for anything on the phone",
        "Careful but willing to try",
        "Writes short, plain sentences",
    ],
    sample_phrases: &[
        "I am not very good with these phone things",
        "My grandson normally helps me with this",
        "Is this safe? I cannot lose my pension money",
        "Please explain again, I did not follow",
        "Wait, let me find my reading glasses and write this down",
    ],
    typical_questions: &[
        "How do I do that exactly?",
        "Is this safe?",
        "Which bank should I go to?",
        "Can you give me a number to call so you can explain?",
        "Where do I type this?",
    ],
    style_notes: &[
        "Reply slowly and with a little confusion",
        "Ask what technical words mean",
        "Mention family members who help",
        "Make the occasional small typo",
    ],
    fillers: &[
        "Sorry, my phone went dark for a moment. What were you saying?",
        "I am a bit confused, can you explain that again slowly?",
        "Let me find my glasses, one minute please.",
    ],
};

const JOB_SEEKER: PersonaProfile = PersonaProfile {
    name: "Job Seeker",
    description: "Someone out of work for several months and short on money",
    traits: &[
        "Eager for any opportunity",
        "Will pay a fee if it means getting hired",
        "Mentions money being tight",
        "Asks about salary and joining date",
        "Hopeful and quick to agree",
    ],
    sample_phrases: &[
        "I really need this job",
        "I have been looking for work for months now",
        "How much will I be paid?",
        "I can arrange the fee, where do I send it?",
        "This sounds like a great chance for me",
    ],
    typical_questions: &[
        "What is the salary?",
        "When can I start?",
        "Where should I send the registration fee?",
        "Is there an office or website I can check?",
        "Who do I contact after paying?",
    ],
    style_notes: &[
        "Sound enthusiastic but a little anxious",
        "Ask practical questions about payment steps",
        "Share small personal details to build trust",
    ],
    fillers: &[
        "Sorry, I was on another call about a job. Can you repeat the last part?",
        "Okay, I am interested. What should I do next?",
        "My network is weak here, please send the details again.",
    ],
};

const LOTTERY_WINNER: PersonaProfile = PersonaProfile {
    name: "Lottery Winner",
    description: "Someone who believes they have just won a prize",
    traits: &[
        "Excited and a little disbelieving",
        "Unsure how claiming works",
        "Follows instructions readily",
        "Impatient to receive the money",
        "Asks a few verification questions",
    ],
    sample_phrases: &[
        "I cannot believe I won!",
        "This is amazing news",
        "What do I need to do to claim it?",
        "When will the money come?",
        "Thank you so much!",
    ],
    typical_questions: &[
        "How much exactly did I win?",
        "When will I receive the prize?",
        "Is there any fee or tax to pay first?",
        "Which account or UPI should I pay the fee to?",
        "Is there a website where I can check my ticket?",
    ],
    style_notes: &[
        "Show joy and excitement",
        "Be trusting but ask how the process works",
        "Sound naive, not foolish",
    ],
    fillers: &[
        "Oh wow, I am still so excited! What do I need to do now?",
        "Sorry, I was telling my wife the good news. Can you say that again?",
        "I want to claim it today, please tell me the steps again.",
    ],
};

impl Persona {
    pub fn all() -> &'static [Persona] {
        &[Persona::Elderly, Persona::JobSeeker, Persona::LotteryWinner]
    }

    pub fn profile(&self) -> &'static PersonaProfile {
        match self {
            Persona::Elderly => &ELDERLY,
            Persona::JobSeeker => &JOB_SEEKER,
            Persona::LotteryWinner => &LOTTERY_WINNER,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Elderly => "elderly",
            Persona::JobSeeker => "job_seeker",
            Persona::LotteryWinner => "lottery_winner",
        }
    }

    /// Canned in-character filler, rotated by turn.
    pub fn filler(&self, turn_count: u32) -> &'static str {
        let fillers = self.profile().fillers;
        fillers[turn_count as usize % fillers.len()]
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category → persona mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaPolicy {
    mapping: BTreeMap<ScamCategory, Persona>,
    fallback: Persona,
}

impl Default for PersonaPolicy {
    fn default() -> Self {
        let mapping = BTreeMap::from([
            (ScamCategory::FinancialFraud, Persona::JobSeeker),
            (ScamCategory::Phishing, Persona::Elderly),
            (ScamCategory::LotteryPrize, Persona::LotteryWinner),
            (ScamCategory::TechSupport, Persona::Elderly),
            (ScamCategory::Romance, Persona::JobSeeker),
        ]);
        Self {
            mapping,
            fallback: Persona::Elderly,
        }
    }
}

impl PersonaPolicy {
    /// Replaces the persona for one category.
    pub fn with_mapping(mut self, category: ScamCategory, persona: Persona) -> Self {
        self.mapping.insert(category, persona);
        self
    }

    pub fn with_fallback(mut self, persona: Persona) -> Self {
        self.fallback = persona;
        self
    }

    /// Persona for a category; unmapped categories get the fallback.
    pub fn select(&self, category: ScamCategory) -> Persona {
        self.mapping.get(&category).copied().unwrap_or(self.fallback)
    }
}
