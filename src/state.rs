// src/state.rs
//! The unit of work threaded through the review pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analyze::ContentAnalysisResult;
use crate::performance::PerformanceMetrics;
use crate::policy::PolicyWindow;
use crate::profile::InfluencerProfile;

/// Pipeline state machine. `Failed` is reachable from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Uninitialized,
    PolicyResolved,
    MapComplete,
    Synthesized,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::PolicyResolved => "policy_resolved",
            Self::MapComplete => "map_complete",
            Self::Synthesized => "synthesized",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CampaignState {
    pub stage: PipelineStage,
    /// The copy the influencer was given.
    pub approved_script: String,
    /// What the influencer actually said.
    pub influencer_transcript: String,
    pub csv_data: String,
    pub campaign_date: Option<NaiveDate>,
    pub influencer_profile: InfluencerProfile,
    /// Absent only when initialization failed.
    pub brand_policy: Option<PolicyWindow>,
    pub content_analysis: Option<ContentAnalysisResult>,
    pub performance_data: Option<PerformanceMetrics>,
    pub final_strategic_review: Option<String>,
    pub errors: Vec<String>,
}

impl CampaignState {
    /// All-empty state carrying a single initialization error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            errors: vec![error.into()],
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stage == PipelineStage::Synthesized && self.errors.is_empty()
    }
}
