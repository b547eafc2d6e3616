// src/capability/mod.rs
//! External capabilities consumed by the analyzer and the synthesizer.
//!
//! - `reasoning`: system instruction + prompt in, free text or JSON text out.
//! - `rates`: current mortgage rate lookup by loan type.
//!
//! Both are trait objects so the orchestrator can be wired with real
//! providers in production and with test doubles everywhere else.

pub mod rates;
pub mod reasoning;

use std::future::Future;
use std::time::Duration;

use crate::error::CapabilityError;

pub use rates::{DynRateLookup, LoanType, RateLookup, RateQuote, SimulatedRateLookup};
pub use reasoning::{
    build_reasoners_from_config, DisabledReasoner, DynReasoner, FailingReasoner, MockReasoner,
    OpenAiReasoner, Reasoners, ReasoningClient, ReasoningRequest, ResponseFormat,
};

/// Bound a capability call; an elapsed timer becomes `CapabilityError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, CapabilityError>
where
    F: Future<Output = Result<T, CapabilityError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(res) => res,
        Err(_) => Err(CapabilityError::Timeout(limit.as_secs())),
    }
}
