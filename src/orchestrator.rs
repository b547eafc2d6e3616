// src/orchestrator.rs
//! # Review Orchestrator
//! Fan-out/fan-in pipeline owning one `CampaignState` per request.
//!
//! ```text
//! Uninitialized ─► PolicyResolved ─► MapComplete ─► Synthesized
//!        └──────────────┴──────────────┴──► Failed
//! ```
//!
//! - Init: date + profile validation and policy lookup. Any failure returns
//!   an all-empty state with a single error.
//! - Map: content analysis ∥ metrics on a bounded pool, joined before moving
//!   on. A metrics failure is recorded once and stops the pipeline.
//! - Reduce: synthesis; a crash is recorded, the state is still returned.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::analyze::{ContentAnalysisResult, ContentAnalyzer};
use crate::error::InitError;
use crate::performance::MetricsEngine;
use crate::policy::{parse_campaign_date, PolicyStore};
use crate::profile::InfluencerProfile;
use crate::state::{CampaignState, PipelineStage};
use crate::synthesize::ReviewSynthesizer;
use crate::telemetry::anon_hash;

/// Raw caller input; nothing here has been validated yet.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub approved_script: String,
    pub influencer_transcript: String,
    pub csv_data: String,
    pub campaign_date: String,
    pub influencer_profile: Value,
}

#[derive(Clone)]
pub struct Orchestrator {
    policies: Arc<PolicyStore>,
    analyzer: Arc<ContentAnalyzer>,
    metrics: MetricsEngine,
    synthesizer: Arc<ReviewSynthesizer>,
    pool: Arc<Semaphore>,
}

impl Orchestrator {
    /// `worker_permits` bounds concurrently running map tasks across all requests.
    pub fn new(
        policies: Arc<PolicyStore>,
        analyzer: Arc<ContentAnalyzer>,
        metrics: MetricsEngine,
        synthesizer: Arc<ReviewSynthesizer>,
        worker_permits: usize,
    ) -> Self {
        Self {
            policies,
            analyzer,
            metrics,
            synthesizer,
            pool: Arc::new(Semaphore::new(worker_permits.max(2))),
        }
    }

    pub fn policies(&self) -> &PolicyStore {
        &self.policies
    }

    /// Run the whole pipeline. Never fails: problems are reported through
    /// `errors`, `stage` and the absent optional fields.
    pub async fn run(&self, request: ReviewRequest) -> CampaignState {
        let started = Instant::now();
        let request_id = anon_hash(&request.influencer_transcript);
        counter!("review_runs_total").increment(1);

        let state = match self.initialize(request) {
            Ok(state) => self.run_from_resolved(state, &request_id).await,
            Err(e) => {
                warn!(target: "orchestrator", %request_id, error = %e, "initialization failed");
                counter!("review_init_failures_total").increment(1);
                CampaignState::failed(format!("Initialization Failed: {e}"))
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("review_duration_ms").record(elapsed_ms);
        info!(
            target: "orchestrator",
            %request_id,
            stage = state.stage.as_str(),
            errors = state.errors.len(),
            elapsed_ms,
            "review finished"
        );
        state
    }

    /// Uninitialized → PolicyResolved.
    fn initialize(&self, request: ReviewRequest) -> Result<CampaignState, InitError> {
        let campaign_date = parse_campaign_date(&request.campaign_date)?;
        let influencer_profile = InfluencerProfile::from_value(request.influencer_profile)?;
        let policy = self
            .policies
            .resolve(campaign_date)
            .ok_or(InitError::NoPolicy(campaign_date))?;

        Ok(CampaignState {
            stage: PipelineStage::PolicyResolved,
            approved_script: request.approved_script,
            influencer_transcript: request.influencer_transcript,
            csv_data: request.csv_data,
            campaign_date: Some(campaign_date),
            influencer_profile,
            brand_policy: Some(policy.clone()),
            ..CampaignState::default()
        })
    }

    async fn run_from_resolved(&self, mut state: CampaignState, request_id: &str) -> CampaignState {
        debug!(
            target: "orchestrator",
            %request_id,
            policy = state.brand_policy.as_ref().map(|p| p.policy_id.as_str()).unwrap_or_default(),
            "policy resolved"
        );

        if let Err(e) = self.map_phase(&mut state).await {
            warn!(target: "orchestrator", %request_id, error = %e, "map phase failed");
            counter!("review_map_failures_total").increment(1);
            state.errors.push(format!("Map Phase Error: {e}"));
            state.stage = PipelineStage::Failed;
            return state;
        }
        state.stage = PipelineStage::MapComplete;

        if let Err(e) = self.reduce_phase(&mut state).await {
            warn!(target: "orchestrator", %request_id, error = %e, "reduce phase failed");
            state.errors.push(format!("Reduce Phase Error: {e}"));
            state.stage = PipelineStage::Failed;
            return state;
        }
        state.stage = PipelineStage::Synthesized;
        state
    }

    /// PolicyResolved → MapComplete. Both tasks always run to completion; the
    /// content result is stored even when metrics fail.
    async fn map_phase(&self, state: &mut CampaignState) -> Result<(), String> {
        let (compliance, forbidden) = match state.brand_policy.as_ref() {
            Some(p) => (p.compliance_phrases.clone(), p.forbidden_topics.clone()),
            None => return Err("no brand policy on state".to_string()),
        };

        let content_task = {
            let pool = self.pool.clone();
            let analyzer = self.analyzer.clone();
            let script = state.approved_script.clone();
            let transcript = state.influencer_transcript.clone();
            tokio::spawn(async move {
                let _permit = pool
                    .acquire_owned()
                    .await
                    .map_err(|e| format!("worker pool closed: {e}"))?;
                Ok::<ContentAnalysisResult, String>(
                    analyzer
                        .analyze(&script, &transcript, &compliance, &forbidden)
                        .await,
                )
            })
        };

        let metrics_task = {
            let pool = self.pool.clone();
            let engine = self.metrics;
            let csv = state.csv_data.clone();
            tokio::spawn(async move {
                let _permit = pool
                    .acquire_owned()
                    .await
                    .map_err(|e| format!("worker pool closed: {e}"))?;
                tokio::task::spawn_blocking(move || engine.compute(&csv))
                    .await
                    .map_err(|e| format!("metrics task crashed: {e}"))?
                    .map_err(|e| e.to_string())
            })
        };

        // Barrier: wait for both, whichever finishes first.
        let (content, metrics) = tokio::join!(content_task, metrics_task);

        let mut failures: Vec<String> = Vec::new();
        match content {
            Ok(Ok(result)) => state.content_analysis = Some(result),
            Ok(Err(e)) => failures.push(e),
            Err(e) => failures.push(format!("content analysis task crashed: {e}")),
        }
        match metrics {
            Ok(Ok(result)) => state.performance_data = Some(result),
            Ok(Err(e)) => failures.push(e),
            Err(e) => failures.push(format!("metrics task crashed: {e}")),
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("; "))
        }
    }

    /// MapComplete → Synthesized.
    async fn reduce_phase(&self, state: &mut CampaignState) -> Result<(), String> {
        let inputs = (
            state.content_analysis.clone(),
            state.performance_data,
            state.brand_policy.clone(),
        );
        let (Some(content), Some(performance), Some(policy)) = inputs else {
            return Err("map phase outputs missing".to_string());
        };
        let profile = state.influencer_profile.clone();
        let synthesizer = self.synthesizer.clone();

        let narrative = tokio::spawn(async move {
            synthesizer
                .synthesize(&content, &performance, &policy, &profile)
                .await
        })
        .await
        .map_err(|e| format!("synthesis task crashed: {e}"))?;

        state.final_strategic_review = Some(narrative);
        Ok(())
    }
}
