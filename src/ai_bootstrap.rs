// src/ai_bootstrap.rs
use std::time::Duration;

use tracing::{info, warn};

use crate::capability::{build_reasoners_from_config, Reasoners, ReasoningRequest};
use crate::config::AiConfig;

/// Loaded AI config plus the clients built from it.
pub struct AiRuntime {
    pub cfg: AiConfig,
    pub reasoners: Reasoners,
}

impl AiRuntime {
    pub fn from_config(cfg: AiConfig, timeout: Duration) -> anyhow::Result<Self> {
        // Safe diagnostics: only provider + enabled + key length
        info!(
            target: "capability",
            provider = %cfg.provider,
            enabled = cfg.enabled,
            key_len = cfg.api_key.len(),
            analysis_model = %cfg.analysis_model,
            synthesis_model = %cfg.synthesis_model,
            "AI config loaded"
        );
        let reasoners = build_reasoners_from_config(&cfg, timeout)?;
        Ok(Self { cfg, reasoners })
    }

    pub fn load_default(timeout: Duration) -> anyhow::Result<Self> {
        Self::from_config(AiConfig::load_default()?, timeout)
    }

    /// One short text request against the synthesis client. Logs, never fails.
    pub async fn quick_probe(&self) {
        if !self.cfg.enabled {
            warn!(target: "capability", "AI quick_probe skipped: AI is disabled in config");
            return;
        }
        let request = ReasoningRequest::text(
            "You are a health check. Reply with one word.",
            "Say ready.",
        );
        match self.reasoners.synthesis.complete(&request).await {
            Ok(reply) => info!(
                target: "capability",
                provider = self.reasoners.synthesis.provider_name(),
                reply_len = reply.len(),
                "AI quick_probe ok"
            ),
            Err(e) => warn!(target: "capability", error = %e, "AI quick_probe failed"),
        }
    }
}
