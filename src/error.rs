// src/error.rs
//! Error taxonomy shared by the review pipeline.
//!
//! Only `PolicyError`, `MetricsError` and `ValidationError` ever reach the
//! orchestrator. Capability and analysis errors are converted into sentinel
//! values inside their components.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to load policies from {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("invalid date '{input}': expected format YYYY-MM-DD")]
    Parse { input: String },
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("CSV missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Metric Calculation Failed: {0}")]
    Computation(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("influencer profile is invalid: {0}")]
    Profile(#[from] serde_json::Error),

    #[error("influencer profile field '{field}' is invalid: {reason}")]
    Field { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability disabled: {0}")]
    Disabled(&'static str),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("capability call timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("malformed analysis response: {0}")]
    Malformed(String),
}

/// Failures before the campaign state exists; they short-circuit the pipeline.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Date(#[from] PolicyError),

    #[error(transparent)]
    Profile(#[from] ValidationError),

    #[error("No active Brand Policy found for date {0}")]
    NoPolicy(chrono::NaiveDate),
}
