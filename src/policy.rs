// src/policy.rs
//! # Brand Policy Store
//!
//! Time-scoped brand policies ("policy windows") loaded once from a JSON file
//! and queried by campaign date.
//!
//! - Windows are kept sorted ascending by `start_date` (stable: equal starts
//!   keep file order).
//! - `resolve(date)` returns the FIRST window active on that date, so when
//!   windows overlap the earliest-starting one wins.
//! - A missing file is not an error: the store is simply empty.
//! - The store is immutable after load and shared as `Arc<PolicyStore>`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use tracing::{info, warn};

use crate::error::PolicyError;

pub const DEFAULT_POLICY_PATH: &str = "config/policies.json";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Window counts at or above this are "frequent" policy changes.
const FREQUENT_CHANGES: usize = 2;
/// Market chaos scores (0-10) at or above this are "high".
const HIGH_CHAOS: u8 = 6;

fn default_compliance_phrases() -> Vec<String> {
    vec!["NMLS #12345".to_string(), "Equal Housing Lender".to_string()]
}

/// The brand rules in force during one date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyWindow {
    pub policy_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub market_trigger: String,
    /// Dynamic brand themes.
    #[serde(default)]
    pub focus_phrases: Vec<String>,
    /// Static legal phrases that must appear verbatim.
    #[serde(default = "default_compliance_phrases")]
    pub compliance_phrases: Vec<String>,
    /// Phrases/concepts that must NOT appear.
    #[serde(default)]
    pub forbidden_topics: Vec<String>,
}

impl PolicyWindow {
    /// Both bounds are inclusive; a missing end date means open-ended.
    pub fn is_active_for(&self, date: NaiveDate) -> bool {
        match self.end_date {
            Some(end) => self.start_date <= date && date <= end,
            None => self.start_date <= date,
        }
    }

    fn overlaps(&self, other: &PolicyWindow) -> bool {
        let self_end = self.end_date.unwrap_or(NaiveDate::MAX);
        let other_end = other.end_date.unwrap_or(NaiveDate::MAX);
        self.start_date <= other_end && other.start_date <= self_end
    }
}

static RE_ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("iso date regex"));

/// Strict `YYYY-MM-DD` parser shared by the store, the orchestrator and the API.
/// No padding, signs or short fields; chrono alone accepts all three.
pub fn parse_campaign_date(input: &str) -> Result<NaiveDate, PolicyError> {
    let parse_error = || PolicyError::Parse {
        input: input.to_string(),
    };
    if !RE_ISO_DATE.is_match(input) {
        return Err(parse_error());
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| parse_error())
}

#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    windows: Vec<PolicyWindow>,
}

impl PolicyStore {
    /// Load and sort the policy history from a JSON array on disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let data = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(target: "policy", path = %path.display(), "policy file not found; starting with no policies");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(PolicyError::Load {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let windows: Vec<PolicyWindow> =
            serde_json::from_str(&data).map_err(|e| PolicyError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let store = Self::from_windows(windows);
        info!(target: "policy", path = %path.display(), windows = store.len(), "policies loaded");
        Ok(store)
    }

    pub fn from_windows(mut windows: Vec<PolicyWindow>) -> Self {
        windows.sort_by_key(|w| w.start_date);

        for pair in windows.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                warn!(
                    target: "policy",
                    earlier = %pair[0].policy_id,
                    later = %pair[1].policy_id,
                    "overlapping policy windows; earliest start wins"
                );
            }
        }

        Self { windows }
    }

    /// First window (ascending start date) active on `date`.
    pub fn resolve(&self, date: NaiveDate) -> Option<&PolicyWindow> {
        self.windows.iter().find(|w| w.is_active_for(date))
    }

    pub fn resolve_str(&self, date: &str) -> Result<Option<&PolicyWindow>, PolicyError> {
        let date = parse_campaign_date(date)?;
        Ok(self.resolve(date))
    }

    pub fn windows(&self) -> &[PolicyWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// How often the policy changed in `[from, to]`, judged against how chaotic
    /// the market was (0-10). Frequent changes are only healthy when the market
    /// forced them.
    pub fn volatility(&self, from: NaiveDate, to: NaiveDate, market_chaos_score: u8) -> VolatilityReport {
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        let chaos = market_chaos_score.min(10);

        let changes: Vec<String> = self
            .windows
            .iter()
            .filter(|w| from <= w.start_date && w.start_date <= to)
            .map(|w| w.name.clone())
            .collect();

        let frequent = changes.len() >= FREQUENT_CHANGES;
        let chaotic = chaos >= HIGH_CHAOS;
        let diagnosis = match (frequent, chaotic) {
            (true, true) => VolatilityDiagnosis::AgileResponse,
            (true, false) => VolatilityDiagnosis::StrategicWhiplash,
            (false, true) => VolatilityDiagnosis::RigidUnderPressure,
            (false, false) => VolatilityDiagnosis::SteadyState,
        };

        VolatilityReport {
            from,
            to,
            market_chaos_score: chaos,
            policy_changes: changes.len(),
            changed_policies: changes,
            strategic_diagnosis: diagnosis,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityDiagnosis {
    /// Frequent changes in a chaotic market.
    AgileResponse,
    /// Frequent changes in a calm market.
    StrategicWhiplash,
    /// No adaptation while the market moved.
    RigidUnderPressure,
    SteadyState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolatilityReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub market_chaos_score: u8,
    pub policy_changes: usize,
    pub changed_policies: Vec<String>,
    pub strategic_diagnosis: VolatilityDiagnosis,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_campaign_date(s).unwrap()
    }

    fn window(id: &str, start: &str, end: Option<&str>) -> PolicyWindow {
        PolicyWindow {
            policy_id: id.to_string(),
            name: format!("Policy {id}"),
            start_date: d(start),
            end_date: end.map(d),
            market_trigger: "Rates Spike".to_string(),
            focus_phrases: vec![],
            compliance_phrases: default_compliance_phrases(),
            forbidden_topics: vec![],
        }
    }

    #[test]
    fn inclusive_bounds() {
        let w = window("a", "2024-01-01", Some("2024-01-31"));
        assert!(w.is_active_for(d("2024-01-01")));
        assert!(w.is_active_for(d("2024-01-31")));
        assert!(!w.is_active_for(d("2023-12-31")));
        assert!(!w.is_active_for(d("2024-02-01")));
    }

    #[test]
    fn open_ended_window_covers_future() {
        let w = window("a", "2024-01-01", None);
        assert!(w.is_active_for(d("2099-12-31")));
    }

    #[test]
    fn from_windows_sorts_by_start() {
        let store = PolicyStore::from_windows(vec![
            window("late", "2024-03-01", None),
            window("early", "2024-01-01", Some("2024-02-28")),
        ]);
        let ids: Vec<_> = store.windows().iter().map(|w| w.policy_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn bad_date_names_expected_format() {
        let err = parse_campaign_date("20/01/2024").unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn compliance_defaults_apply_when_missing() {
        let raw = r#"{"policy_id":"p","name":"n","start_date":"2024-01-01","market_trigger":"t"}"#;
        let w: PolicyWindow = serde_json::from_str(raw).unwrap();
        assert_eq!(w.compliance_phrases, vec!["NMLS #12345", "Equal Housing Lender"]);
        assert!(w.forbidden_topics.is_empty());
        assert!(w.end_date.is_none());
    }

    #[test]
    fn volatility_diagnoses_whiplash_vs_agility() {
        let store = PolicyStore::from_windows(vec![
            window("a", "2024-01-01", Some("2024-01-15")),
            window("b", "2024-01-16", Some("2024-02-10")),
            window("c", "2024-02-11", None),
        ]);
        let calm = store.volatility(d("2024-01-01"), d("2024-02-28"), 2);
        assert_eq!(calm.policy_changes, 3);
        assert_eq!(calm.strategic_diagnosis, VolatilityDiagnosis::StrategicWhiplash);

        let chaotic = store.volatility(d("2024-01-01"), d("2024-02-28"), 8);
        assert_eq!(chaotic.strategic_diagnosis, VolatilityDiagnosis::AgileResponse);

        let quiet = store.volatility(d("2024-03-01"), d("2024-03-31"), 9);
        assert_eq!(quiet.policy_changes, 0);
        assert_eq!(quiet.strategic_diagnosis, VolatilityDiagnosis::RigidUnderPressure);
    }
}
