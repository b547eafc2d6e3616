// src/analyze/mod.rs
//! Content analyzer: script (the plan) vs transcript (the reality).
//!
//! Order:
//! 1) Deterministic screening (forbidden-topic deviations, missing compliance)
//! 2) Best-effort rate lookups when the texts talk about rates or payments
//! 3) Reasoning call returning JSON, parsed into `ContentAnalysisResult`
//!
//! `analyze` never fails: any error in (3) yields the sentinel result, which
//! still carries the deterministic findings from (1) and (2).

pub mod content;
pub mod screening;

use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use crate::capability::{
    with_timeout, DynRateLookup, DynReasoner, RateQuote, ReasoningRequest,
};
use crate::error::AnalysisError;

pub use content::{parse_analysis, ContentAnalysisResult, HookStrength, RateCheck};

const SYSTEM_PROTOCOL: &str = "You are an expert Content Strategist and Compliance Auditor. Analyze the script delivery.

PROTOCOL:
1. Compare the APPROVED SCRIPT (the plan) against the INFLUENCER TRANSCRIPT (the reality).
2. Check the transcript against the mandatory compliance phrases and the forbidden topics.
3. Use the MARKET RATE CONTEXT, when present, to judge any rate or payment claims.
4. Output valid JSON with keys: tone_score (integer 1-10), hook_strength (High|Medium|Low), key_themes (list of strings), rate_check (Valid|Invalid|Not Applicable), deviation_summary (list of verbatim transcript sentences that violate forbidden topics or compliance rules).";

pub struct ContentAnalyzer {
    reasoner: DynReasoner,
    rates: DynRateLookup,
    timeout: Duration,
}

impl ContentAnalyzer {
    pub fn new(reasoner: DynReasoner, rates: DynRateLookup, timeout: Duration) -> Self {
        Self {
            reasoner,
            rates,
            timeout,
        }
    }

    pub async fn analyze(
        &self,
        approved_script: &str,
        transcript: &str,
        compliance_phrases: &[String],
        forbidden_topics: &[String],
    ) -> ContentAnalysisResult {
        let deviations = screening::forbidden_deviations(approved_script, transcript, forbidden_topics);
        let missing = screening::missing_compliance(transcript, compliance_phrases);
        let quotes = self.lookup_rates(approved_script, transcript).await;

        let mut result = match self
            .try_analyze(approved_script, transcript, compliance_phrases, forbidden_topics, &quotes)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    target: "analyze",
                    provider = self.reasoner.provider_name(),
                    error = %e,
                    "content analysis degraded to sentinel"
                );
                counter!("content_analysis_degraded_total").increment(1);
                ContentAnalysisResult::sentinel(&e.to_string())
            }
        };

        result.merge_deviations(deviations);
        result.missing_compliance = missing;
        result.market_rates = quotes;
        result
    }

    async fn try_analyze(
        &self,
        approved_script: &str,
        transcript: &str,
        compliance_phrases: &[String],
        forbidden_topics: &[String],
        quotes: &[RateQuote],
    ) -> Result<ContentAnalysisResult, AnalysisError> {
        let request = ReasoningRequest::json(
            system_instruction(compliance_phrases, forbidden_topics),
            adherence_prompt(approved_script, transcript, quotes),
        );
        let raw = with_timeout(self.timeout, self.reasoner.complete(&request)).await?;
        debug!(target: "analyze", reply_len = raw.len(), "analysis reply received");
        parse_analysis(&raw)
    }

    /// Zero or more lookups; failures are logged and skipped.
    async fn lookup_rates(&self, approved_script: &str, transcript: &str) -> Vec<RateQuote> {
        let mut quotes = Vec::new();
        for loan_type in screening::referenced_loan_types(&[approved_script, transcript]) {
            counter!("rate_lookups_total").increment(1);
            match with_timeout(self.timeout, self.rates.current_rate(loan_type)).await {
                Ok(q) => quotes.push(q),
                Err(e) => {
                    warn!(target: "analyze", loan_type = loan_type.as_str(), error = %e, "rate lookup skipped");
                }
            }
        }
        quotes
    }
}

fn system_instruction(compliance_phrases: &[String], forbidden_topics: &[String]) -> String {
    format!(
        "{SYSTEM_PROTOCOL}\n\nMANDATORY COMPLIANCE PHRASES: {compliance_phrases:?}\nFORBIDDEN TOPICS (Risk Check - list specific violation sentences): {forbidden_topics:?}"
    )
}

fn adherence_prompt(approved_script: &str, transcript: &str, quotes: &[RateQuote]) -> String {
    let mut prompt = format!(
        "Perform a DUAL SCORE ADHERENCE check (Semantic Fidelity & Risk Deviation).\n\n\
         COMPARE:\n\
         A) Approved Script (PLAN): \"{approved_script}\"\n\
         B) Influencer Transcript (REALITY): \"{transcript}\"\n\n\
         1. Check Compliance: were all MANDATORY PHRASES used?\n\
         2. Check Fidelity: does the transcript's meaning align with the approved script?\n\
         3. Check Deviation: list transcript sentences violating FORBIDDEN TOPICS in 'deviation_summary'.\n"
    );
    if !quotes.is_empty() {
        prompt.push_str("\nMARKET RATE CONTEXT:\n");
        for q in quotes {
            prompt.push_str(&format!(
                "- {}: {:.2}% (trend: {}, as of {})\n",
                q.loan_type.as_str(),
                q.rate_percentage,
                q.trend,
                q.timestamp
            ));
        }
    }
    prompt.push_str("\nReturn ONLY the JSON object.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{FailingReasoner, LoanType, MockReasoner, RateLookup, SimulatedRateLookup};
    use crate::error::CapabilityError;
    use std::sync::Arc;

    struct DownRates;

    #[async_trait::async_trait]
    impl RateLookup for DownRates {
        async fn current_rate(&self, _loan_type: LoanType) -> Result<RateQuote, CapabilityError> {
            Err(CapabilityError::Unavailable("rates feed down".into()))
        }
    }

    fn phrases(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn rate_lookup_failure_does_not_block_result() {
        let analyzer = ContentAnalyzer::new(
            Arc::new(MockReasoner::default()),
            Arc::new(DownRates),
            Duration::from_secs(5),
        );
        let r = analyzer
            .analyze("Lock in your rate today!", "Lock in your rate today!", &[], &[])
            .await;
        assert_eq!(r.tone_score, 7);
        assert!(r.market_rates.is_empty());
    }

    #[tokio::test]
    async fn rate_talk_triggers_lookup() {
        let analyzer = ContentAnalyzer::new(
            Arc::new(MockReasoner::default()),
            Arc::new(SimulatedRateLookup),
            Duration::from_secs(5),
        );
        let r = analyzer
            .analyze("Lock in your rate today!", "Rates are moving.", &[], &[])
            .await;
        assert_eq!(r.market_rates.len(), 1);
        assert_eq!(r.market_rates[0].loan_type, LoanType::ThirtyYearFixed);
    }

    #[tokio::test]
    async fn sentinel_keeps_deterministic_findings() {
        let analyzer = ContentAnalyzer::new(
            Arc::new(FailingReasoner::new("provider exploded")),
            Arc::new(SimulatedRateLookup),
            Duration::from_secs(5),
        );
        let r = analyzer
            .analyze(
                "Buy now.",
                "Buy now. Results are guaranteed.",
                &phrases(&["NMLS #12345"]),
                &phrases(&["guarantee"]),
            )
            .await;
        assert_eq!(r.tone_score, 0);
        assert_eq!(r.rate_check, RateCheck::Error);
        assert!(r.deviation_summary[0].starts_with("System Error:"));
        assert!(r.deviation_summary[0].contains("provider exploded"));
        assert!(r.deviation_summary.contains(&"Results are guaranteed.".to_string()));
        assert_eq!(r.missing_compliance, vec!["NMLS #12345"]);
    }

    #[test]
    fn prompt_carries_rules_and_quotes() {
        let sys = system_instruction(&phrases(&["Equal Housing Lender"]), &phrases(&["guarantee"]));
        assert!(sys.contains("Equal Housing Lender"));
        assert!(sys.contains("guarantee"));

        let q = RateQuote {
            loan_type: LoanType::ThirtyYearFixed,
            rate_percentage: 6.87,
            trend: "stable".into(),
            timestamp: chrono::NaiveDate::from_ymd_opt(2025, 11, 18).unwrap(),
        };
        let p = adherence_prompt("plan", "reality", &[q]);
        assert!(p.contains("30_year_fixed: 6.87%"));
        assert!(p.contains("\"reality\""));
    }
}
