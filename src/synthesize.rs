// src/synthesize.rs
//! # Review Synthesizer
//! Multivariate attribution: was performance driven by the Market, the
//! Message, or the Messenger? Combines content analysis, lead metrics, the
//! active policy and the influencer persona into one reasoning request.
//!
//! `synthesize` always returns a string; failures come back as
//! `"Synthesis error: ..."` for the caller to interpret.

use std::time::Duration;

use metrics::counter;
use tracing::warn;

use crate::analyze::ContentAnalysisResult;
use crate::capability::{with_timeout, DynReasoner, ReasoningRequest};
use crate::error::CapabilityError;
use crate::performance::PerformanceMetrics;
use crate::policy::PolicyWindow;
use crate::profile::InfluencerProfile;

pub const SYNTHESIS_ERROR_PREFIX: &str = "Synthesis error:";

pub struct ReviewSynthesizer {
    reasoner: DynReasoner,
    timeout: Duration,
}

impl ReviewSynthesizer {
    pub fn new(reasoner: DynReasoner, timeout: Duration) -> Self {
        Self { reasoner, timeout }
    }

    pub async fn synthesize(
        &self,
        content: &ContentAnalysisResult,
        performance: &PerformanceMetrics,
        policy: &PolicyWindow,
        profile: &InfluencerProfile,
    ) -> String {
        match self.try_synthesize(content, performance, policy, profile).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    target: "synthesize",
                    provider = self.reasoner.provider_name(),
                    error = %e,
                    "strategic review degraded"
                );
                counter!("synthesis_degraded_total").increment(1);
                format!("{SYNTHESIS_ERROR_PREFIX} {e}")
            }
        }
    }

    async fn try_synthesize(
        &self,
        content: &ContentAnalysisResult,
        performance: &PerformanceMetrics,
        policy: &PolicyWindow,
        profile: &InfluencerProfile,
    ) -> Result<String, CapabilityError> {
        let request = ReasoningRequest::text(
            system_instruction(policy, profile),
            review_prompt(content, performance)?,
        );
        with_timeout(self.timeout, self.reasoner.complete(&request)).await
    }
}

fn system_instruction(policy: &PolicyWindow, profile: &InfluencerProfile) -> String {
    let archetypes = profile.archetype_labels();
    let persona_par = profile
        .avg_lead_volume
        .map(|v| format!(", historical par: {v} leads"))
        .unwrap_or_default();
    format!(
        "You are the Lead Performance Strategist. Your goal is multivariate attribution: finding if performance was due to the Market, the Message, or the Messenger.

CORE PHILOSOPHY: Market rates are the primary driver of lead performance, serving as the contextual lens (headwind/tailwind).

INPUT CONTEXT:
- Campaign Policy: {name} (Trigger: {trigger})
- Brand Focus: {focus:?}
- Influencer Persona: {persona} (Archetypes: {archetypes:?}{persona_par})

ANALYSIS PROTOCOL (chain-of-thought required in <thought_process> tags):
1. Contextualize Market: does '{trigger}' suggest a headwind or a tailwind?
2. Evaluate Persona Fit: do the tone and hook scores align with the archetypes {archetypes:?}?
3. Correlate Performance: weigh lead volume (north star) against the market context. Steady Hand protocol: low volume in a headwind is acceptable and needs no change.
4. Strategy Generation: provide actionable recommendations (copy changes, scaling, or maintenance).",
        name = policy.name,
        trigger = policy.market_trigger,
        focus = policy.focus_phrases,
        persona = profile.name,
    )
}

fn review_prompt(
    content: &ContentAnalysisResult,
    performance: &PerformanceMetrics,
) -> Result<String, CapabilityError> {
    let content_json = serde_json::to_string(content)
        .map_err(|e| CapabilityError::Unavailable(format!("encoding content analysis: {e}")))?;
    let performance_json = serde_json::to_string(performance)
        .map_err(|e| CapabilityError::Unavailable(format!("encoding performance metrics: {e}")))?;
    Ok(format!(
        "Content Analysis (Quality/Compliance): {content_json}\n\
         Performance Metrics (Volume/Quality): {performance_json}\n\n\
         Provide a final Strategic Review."
    ))
}
