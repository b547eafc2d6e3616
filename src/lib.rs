// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain model
pub mod performance;
pub mod policy;
pub mod profile;
pub mod state;

// Capability boundaries and the components built on them
pub mod analyze;
pub mod capability;
pub mod synthesize;

pub mod orchestrator;

pub mod ai_bootstrap;

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::ai_bootstrap::AiRuntime;
use crate::analyze::ContentAnalyzer;
use crate::api::{create_router, AppState};
use crate::capability::{Reasoners, SimulatedRateLookup};
use crate::config::ServiceConfig;
use crate::metrics::Metrics;
use crate::orchestrator::Orchestrator;
use crate::performance::MetricsEngine;
use crate::policy::PolicyStore;
use crate::synthesize::ReviewSynthesizer;

// ---- Re-exports for stable public API ----
pub use crate::orchestrator::ReviewRequest;
pub use crate::state::{CampaignState, PipelineStage};

/// Wire components from already-loaded pieces.
pub fn build_orchestrator(
    cfg: &ServiceConfig,
    policies: PolicyStore,
    reasoners: Reasoners,
) -> Orchestrator {
    let timeout = cfg.capability_timeout();
    Orchestrator::new(
        Arc::new(policies),
        Arc::new(ContentAnalyzer::new(
            reasoners.analysis,
            Arc::new(SimulatedRateLookup),
            timeout,
        )),
        MetricsEngine::new(),
        Arc::new(ReviewSynthesizer::new(reasoners.synthesis, timeout)),
        cfg.worker_permits,
    )
}

/// Full HTTP surface (API + `/metrics`) for one orchestrator.
pub fn router_with(orchestrator: Orchestrator) -> anyhow::Result<Router> {
    let metrics = Metrics::init()?;
    metrics.set_policy_windows(orchestrator.policies().len());
    Ok(create_router(AppState { orchestrator }).merge(metrics.router()))
}

/// Load every config source from disk/env and build the router.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = ServiceConfig::load()?;
    let policies = PolicyStore::load(&cfg.policy_path)?;
    let ai = AiRuntime::load_default(cfg.capability_timeout())?;

    if std::env::var("AI_QUICK_PROBE").is_ok_and(|v| v == "1") {
        ai.quick_probe().await;
    }

    info!(
        policy_path = %cfg.policy_path,
        policy_windows = policies.len(),
        worker_permits = cfg.worker_permits,
        capability_timeout_secs = cfg.capability_timeout_secs,
        "campaign review agent configured"
    );

    router_with(build_orchestrator(&cfg, policies, ai.reasoners))
}
