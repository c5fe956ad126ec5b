//! Response synthesis - persona replies with consistency checks and timing.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{CompletionGateway, CompletionOutcome};
use crate::domain::engagement::{
    build_synthesis_prompt, check_reply, clean_reply, ReplyCheck, SynthesisContext, CLOSING_REPLY,
    DECLINED_REPLY,
};
use crate::domain::foundation::Timestamp;
use crate::ports::{CompletionPurpose, CompletionRequest};

/// Synthesis tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisSettings {
    /// Word-set Jaccard similarity above which a reply counts as repeated.
    pub similarity_threshold: f64,
    /// How many recent outbound replies are compared against.
    pub recent_outbound_window: usize,
    pub min_response_delay_ms: u64,
    pub max_response_delay_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            recent_outbound_window: 3,
            min_response_delay_ms: 1000,
            max_response_delay_ms: 3000,
            temperature: 0.8,
            max_tokens: 150,
        }
    }
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Generated,
    Regenerated,
    Filler,
    Declined,
    Closing,
}

/// A reply ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedReply {
    pub text: String,
    /// Earliest time the reply should be delivered.
    pub send_at: Timestamp,
    pub source: ReplySource,
    /// True when a completion call was unavailable.
    pub degraded: bool,
}

pub struct ResponseSynthesizer {
    gateway: Arc<CompletionGateway>,
    settings: SynthesisSettings,
}

impl ResponseSynthesizer {
    pub fn new(gateway: Arc<CompletionGateway>, settings: SynthesisSettings) -> Self {
        Self { gateway, settings }
    }

    pub fn settings(&self) -> &SynthesisSettings {
        &self.settings
    }

    /// Neutral reply for a sender judged not to be a scammer.
    pub fn declined(&self, received_at: Timestamp) -> SynthesizedReply {
        self.canned(DECLINED_REPLY, ReplySource::Declined, received_at)
    }

    /// Persona-neutral goodbye for a terminated session.
    pub fn closing(&self, received_at: Timestamp) -> SynthesizedReply {
        self.canned(CLOSING_REPLY, ReplySource::Closing, received_at)
    }

    /// Generates an in-character reply.
    ///
    /// A reply that is empty, gives the persona away or repeats a recent
    /// reply is regenerated once; if the second attempt also fails the
    /// checks, or the service is unavailable, a canned persona filler is
    /// used instead.
    pub async fn synthesize(
        &self,
        ctx: &SynthesisContext<'_>,
        recent_outbound: &[String],
        received_at: Timestamp,
    ) -> SynthesizedReply {
        let window_start = recent_outbound
            .len()
            .saturating_sub(self.settings.recent_outbound_window);
        let recent = &recent_outbound[window_start..];
        let prompt = build_synthesis_prompt(ctx);

        let mut degraded = false;
        for (attempt, source) in [ReplySource::Generated, ReplySource::Regenerated]
            .into_iter()
            .enumerate()
        {
            let request = CompletionRequest::new(CompletionPurpose::Synthesis)
                .with_system_prompt(prompt.system.clone())
                .with_prompt(prompt.user.clone())
                .with_temperature(self.settings.temperature)
                .with_max_tokens(self.settings.max_tokens);

            let raw = match self.gateway.complete(request).await {
                CompletionOutcome::Completed(response) => response.content,
                CompletionOutcome::Unavailable { .. } => {
                    degraded = true;
                    break;
                }
            };

            let reply = clean_reply(&raw);
            match check_reply(&reply, recent, self.settings.similarity_threshold) {
                ReplyCheck::Accepted => {
                    return SynthesizedReply {
                        text: reply,
                        send_at: self.send_time(received_at),
                        source,
                        degraded,
                    };
                }
                rejected => {
                    debug!(attempt, ?rejected, "Reply failed consistency check");
                }
            }
        }

        if !degraded {
            warn!(persona = %ctx.persona, "Falling back to persona filler");
        }
        SynthesizedReply {
            text: ctx.persona.filler(ctx.turn_count).to_string(),
            send_at: self.send_time(received_at),
            source: ReplySource::Filler,
            degraded,
        }
    }

    fn canned(&self, text: &str, source: ReplySource, received_at: Timestamp) -> SynthesizedReply {
        SynthesizedReply {
            text: text.to_string(),
            send_at: self.send_time(received_at),
            source,
            degraded: false,
        }
    }

    /// Reception time plus a random delay from the configured range.
    fn send_time(&self, received_at: Timestamp) -> Timestamp {
        let min = self.settings.min_response_delay_ms;
        let max = self.settings.max_response_delay_ms.max(min);
        let delay = rand::thread_rng().gen_range(min..=max);
        received_at.plus_millis(delay)
    }
}
