//! Mortgage rate fact lookup.
//!
//! The analyzer calls this when a script talks about rates or payments so the
//! reasoning step can judge claims against the current market. Results are
//! best-effort: a failed lookup is skipped, never fatal.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanType {
    #[serde(rename = "30_year_fixed")]
    ThirtyYearFixed,
    #[serde(rename = "15_year_fixed")]
    FifteenYearFixed,
    #[serde(rename = "5_1_arm")]
    FiveOneArm,
}

impl LoanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThirtyYearFixed => "30_year_fixed",
            Self::FifteenYearFixed => "15_year_fixed",
            Self::FiveOneArm => "5_1_arm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    pub loan_type: LoanType,
    pub rate_percentage: f64,
    pub trend: String,
    pub timestamp: NaiveDate,
}

#[async_trait::async_trait]
pub trait RateLookup: Send + Sync {
    async fn current_rate(&self, loan_type: LoanType) -> Result<RateQuote, CapabilityError>;
}

pub type DynRateLookup = Arc<dyn RateLookup>;

/// Simulated national average: 6.5%–7.5% around a 30-year base, shifted
/// per product, trend always "stable".
#[derive(Debug, Clone, Default)]
pub struct SimulatedRateLookup;

impl SimulatedRateLookup {
    fn spread(loan_type: LoanType) -> f64 {
        match loan_type {
            LoanType::ThirtyYearFixed => 0.0,
            LoanType::FifteenYearFixed => -0.6,
            LoanType::FiveOneArm => -0.3,
        }
    }
}

#[async_trait::async_trait]
impl RateLookup for SimulatedRateLookup {
    async fn current_rate(&self, loan_type: LoanType) -> Result<RateQuote, CapabilityError> {
        let jitter: f64 = rand::rng().random_range(0.0..1.0);
        let rate = 6.5 + jitter + Self::spread(loan_type);
        Ok(RateQuote {
            loan_type,
            rate_percentage: (rate * 100.0).round() / 100.0,
            trend: "stable".to_string(),
            timestamp: Utc::now().date_naive(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_thirty_year_stays_in_band() {
        let lookup = SimulatedRateLookup;
        for _ in 0..20 {
            let q = lookup.current_rate(LoanType::ThirtyYearFixed).await.unwrap();
            assert!((6.5..=7.5).contains(&q.rate_percentage), "rate {}", q.rate_percentage);
            assert_eq!(q.trend, "stable");
        }
    }

    #[test]
    fn loan_type_wire_names() {
        let v = serde_json::to_value(LoanType::ThirtyYearFixed).unwrap();
        assert_eq!(v, serde_json::json!("30_year_fixed"));
        assert_eq!(LoanType::FiveOneArm.as_str(), "5_1_arm");
    }
}
