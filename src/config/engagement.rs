//! Engagement, extraction and synthesis configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::SynthesisSettings;
use crate::domain::engagement::EngagementLimits;
use crate::domain::foundation::ValidationError as FieldError;
use crate::domain::intelligence::ArtifactType;

/// Turn and time budget of an engagement
#[derive(Debug, Clone, Deserialize)]
pub struct EngagementConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Seconds from engagement start (or session creation) until termination
    #[serde(default = "default_time_budget")]
    pub time_budget_secs: u64,

    /// Inbound turns required before extraction can complete the session
    #[serde(default = "default_min_turns_before_completion")]
    pub min_turns_before_completion: u32,
}

impl EngagementConfig {
    pub fn limits(&self) -> EngagementLimits {
        EngagementLimits {
            max_turns: self.max_turns,
            time_budget_secs: self.time_budget_secs,
            min_turns_before_completion: self.min_turns_before_completion,
            target_types: ArtifactType::all().to_vec(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.limits().validate()?;
        if self.min_turns_before_completion > self.max_turns {
            return Err(FieldError::out_of_range(
                "min_turns_before_completion",
                0,
                self.max_turns as i64,
                self.min_turns_before_completion as i64,
            )
            .into());
        }
        Ok(())
    }
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            time_budget_secs: default_time_budget(),
            min_turns_before_completion: default_min_turns_before_completion(),
        }
    }
}

fn default_max_turns() -> u32 {
    20
}

fn default_time_budget() -> u64 {
    1800
}

fn default_min_turns_before_completion() -> u32 {
    5
}

/// Artifact extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Ask the completion service to confirm candidates
    #[serde(default = "default_semantic_verification")]
    pub semantic_verification: bool,

    /// Prior inbound turns re-scanned with each message
    #[serde(default = "default_lookback_turns")]
    pub lookback_turns: usize,
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lookback_turns > 20 {
            return Err(
                FieldError::out_of_range("lookback_turns", 0, 20, self.lookback_turns as i64)
                    .into(),
            );
        }
        Ok(())
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            semantic_verification: default_semantic_verification(),
            lookback_turns: default_lookback_turns(),
        }
    }
}

fn default_semantic_verification() -> bool {
    true
}

fn default_lookback_turns() -> usize {
    3
}

/// Reply synthesis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_min_delay")]
    pub min_response_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_response_delay_ms: u64,

    /// Word-set similarity above which a reply counts as repeated
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "default_recent_outbound_window")]
    pub recent_outbound_window: usize,

    /// Transcript entries included in the reply prompt
    #[serde(default = "default_transcript_window")]
    pub transcript_window: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl SynthesisConfig {
    pub fn settings(&self) -> SynthesisSettings {
        SynthesisSettings {
            similarity_threshold: self.similarity_threshold,
            recent_outbound_window: self.recent_outbound_window,
            min_response_delay_ms: self.min_response_delay_ms,
            max_response_delay_ms: self.max_response_delay_ms,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_response_delay_ms > self.max_response_delay_ms {
            return Err(ValidationError::InvalidDelayRange);
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(FieldError::invalid_format(
                "similarity_threshold",
                "must be within (0, 1]",
            )
            .into());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(FieldError::invalid_format("temperature", "must be within [0, 2]").into());
        }
        if self.max_tokens == 0 {
            return Err(FieldError::out_of_range("max_tokens", 1, 4096, 0).into());
        }
        Ok(())
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            min_response_delay_ms: default_min_delay(),
            max_response_delay_ms: default_max_delay(),
            similarity_threshold: default_similarity_threshold(),
            recent_outbound_window: default_recent_outbound_window(),
            transcript_window: default_transcript_window(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_min_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    3000
}

fn default_similarity_threshold() -> f64 {
    0.8
}

fn default_recent_outbound_window() -> usize {
    3
}

fn default_transcript_window() -> usize {
    10
}

fn default_temperature() -> f32 {
    0.8
}

fn default_max_tokens() -> u32 {
    150
}
