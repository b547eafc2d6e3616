// src/analyze/content.rs
//! Structured output of the content analyzer and the parser that turns a
//! reasoning reply into it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::capability::RateQuote;
use crate::error::AnalysisError;

pub const ERROR_THEME: &str = "ERROR";

/// Strength of the first three seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookStrength {
    High,
    Medium,
    Low,
}

impl HookStrength {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Did the script's rate claims match the current market?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateCheck {
    Valid,
    Invalid,
    #[serde(rename = "Not Applicable")]
    NotApplicable,
    /// Only produced by the degraded sentinel.
    Error,
}

impl RateCheck {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "valid" => Some(Self::Valid),
            "invalid" => Some(Self::Invalid),
            "not applicable" | "not_applicable" | "notapplicable" | "n/a" | "na" => {
                Some(Self::NotApplicable)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysisResult {
    /// 1-10 tone appropriateness; 0 marks a degraded result.
    pub tone_score: u8,
    pub hook_strength: HookStrength,
    #[serde(default)]
    pub key_themes: Vec<String>,
    pub rate_check: RateCheck,
    /// Verbatim transcript sentences that break forbidden-topic rules.
    #[serde(default)]
    pub deviation_summary: Vec<String>,
    /// Mandatory phrases the influencer never said.
    #[serde(default)]
    pub missing_compliance: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub market_rates: Vec<RateQuote>,
}

impl ContentAnalysisResult {
    /// Structurally valid stand-in returned whenever analysis fails.
    pub fn sentinel(error: &str) -> Self {
        Self {
            tone_score: 0,
            hook_strength: HookStrength::Low,
            key_themes: vec![ERROR_THEME.to_string()],
            rate_check: RateCheck::Error,
            deviation_summary: vec![format!("System Error: {error}")],
            missing_compliance: Vec::new(),
            market_rates: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.rate_check == RateCheck::Error
    }

    /// Append excerpts not already present, keeping order.
    pub(crate) fn merge_deviations(&mut self, excerpts: Vec<String>) {
        for e in excerpts {
            if !self.deviation_summary.iter().any(|d| d.trim() == e.trim()) {
                self.deviation_summary.push(e);
            }
        }
    }
}

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fence regex"));

/// Unwrap ```json fences if the model added them.
fn strip_fences(raw: &str) -> &str {
    match RE_FENCE.captures(raw).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => raw.trim(),
    }
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    tone_score: i64,
    hook_strength: String,
    #[serde(default, alias = "themes")]
    key_themes: Vec<String>,
    #[serde(default)]
    rate_check: Option<String>,
    #[serde(default)]
    deviation_summary: Vec<String>,
}

/// Parse a reasoning reply into a result. Shape errors and unknown enum
/// labels are `Malformed`; an out-of-range tone score is clamped.
pub fn parse_analysis(raw: &str) -> Result<ContentAnalysisResult, AnalysisError> {
    let body = strip_fences(raw);
    let parsed: RawAnalysis =
        serde_json::from_str(body).map_err(|e| AnalysisError::Malformed(e.to_string()))?;

    let hook_strength = HookStrength::parse(&parsed.hook_strength).ok_or_else(|| {
        AnalysisError::Malformed(format!("unknown hook_strength '{}'", parsed.hook_strength))
    })?;

    let rate_check = match parsed.rate_check.as_deref() {
        None => RateCheck::NotApplicable,
        Some(s) => RateCheck::parse(s)
            .ok_or_else(|| AnalysisError::Malformed(format!("unknown rate_check '{s}'")))?,
    };

    let tone_score = if (1..=10).contains(&parsed.tone_score) {
        parsed.tone_score as u8
    } else {
        warn!(target: "analyze", tone_score = parsed.tone_score, "tone score out of range; clamping");
        parsed.tone_score.clamp(1, 10) as u8
    };

    Ok(ContentAnalysisResult {
        tone_score,
        hook_strength,
        key_themes: parsed.key_themes,
        rate_check,
        deviation_summary: parsed
            .deviation_summary
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        missing_compliance: Vec::new(),
        market_rates: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"tone_score\": 8, \"hook_strength\": \"High\", \"key_themes\": [\"Urgency\"], \"rate_check\": \"Valid\", \"deviation_summary\": [\"x\"]}\n```";
        let r = parse_analysis(raw).unwrap();
        assert_eq!(r.tone_score, 8);
        assert_eq!(r.hook_strength, HookStrength::High);
        assert_eq!(r.rate_check, RateCheck::Valid);
        assert_eq!(r.deviation_summary, vec!["x"]);
    }

    #[test]
    fn missing_rate_check_defaults_to_not_applicable() {
        let r = parse_analysis(r#"{"tone_score": 5, "hook_strength": "low"}"#).unwrap();
        assert_eq!(r.rate_check, RateCheck::NotApplicable);
        assert!(r.key_themes.is_empty());
    }

    #[test]
    fn out_of_range_tone_is_clamped() {
        let r = parse_analysis(r#"{"tone_score": 14, "hook_strength": "Medium"}"#).unwrap();
        assert_eq!(r.tone_score, 10);
    }

    #[test]
    fn garbage_and_unknown_labels_are_malformed() {
        assert!(matches!(parse_analysis("I think it went well"), Err(AnalysisError::Malformed(_))));
        assert!(matches!(
            parse_analysis(r#"{"tone_score": 5, "hook_strength": "Huge"}"#),
            Err(AnalysisError::Malformed(_))
        ));
    }

    #[test]
    fn sentinel_wire_shape() {
        let v = serde_json::to_value(ContentAnalysisResult::sentinel("boom")).unwrap();
        assert_eq!(v["tone_score"], serde_json::json!(0));
        assert_eq!(v["hook_strength"], serde_json::json!("Low"));
        assert_eq!(v["rate_check"], serde_json::json!("Error"));
        assert_eq!(v["key_themes"], serde_json::json!(["ERROR"]));
        assert_eq!(v["deviation_summary"][0], serde_json::json!("System Error: boom"));
    }

    #[test]
    fn not_applicable_serializes_with_space() {
        let v = serde_json::to_value(RateCheck::NotApplicable).unwrap();
        assert_eq!(v, serde_json::json!("Not Applicable"));
    }
}
