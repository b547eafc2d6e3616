// src/performance.rs
//! Deterministic lead metrics from uploaded campaign CSV.
//!
//! Required header columns (whitespace-trimmed, case-sensitive):
//! `New Leads`, `SignOffs` (leads lost / disqualified) and `Closes`.
//! Each column is summed across all rows. Derived figures (qualified leads,
//! win rate) are computed on read and never stored.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::MetricsError;

pub const COL_NEW_LEADS: &str = "New Leads";
pub const COL_SIGN_OFFS: &str = "SignOffs";
pub const COL_CLOSES: &str = "Closes";

const REQUIRED_COLUMNS: [&str; 3] = [COL_NEW_LEADS, COL_SIGN_OFFS, COL_CLOSES];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct PerformanceMetrics {
    /// The north star: total lead volume.
    pub raw_lead_count: u64,
    /// Fall-out.
    pub lost_leads: u64,
    /// Revenue event proxy.
    pub closed_count: u64,
}

impl PerformanceMetrics {
    pub fn new(raw_lead_count: u64, lost_leads: u64, closed_count: u64) -> Self {
        Self {
            raw_lead_count,
            lost_leads,
            closed_count,
        }
    }

    /// Leads minus fall-out. Negative only when the input data is inconsistent.
    pub fn qualified_lead_count(&self) -> i64 {
        self.raw_lead_count as i64 - self.lost_leads as i64
    }

    /// `closed / raw`, rounded to 3 decimals; 0.0 when there are no leads.
    pub fn win_rate(&self) -> f64 {
        if self.raw_lead_count == 0 {
            return 0.0;
        }
        let rate = self.closed_count as f64 / self.raw_lead_count as f64;
        // Ties round to even: 1/16 -> 0.062.
        (rate * 1000.0).round_ties_even() / 1000.0
    }

    pub fn has_consistent_counts(&self) -> bool {
        self.lost_leads <= self.raw_lead_count
    }
}

// Derived values are part of the wire shape but not of the struct.
impl Serialize for PerformanceMetrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PerformanceMetrics", 5)?;
        s.serialize_field("raw_lead_count", &self.raw_lead_count)?;
        s.serialize_field("lost_leads", &self.lost_leads)?;
        s.serialize_field("closed_count", &self.closed_count)?;
        s.serialize_field("qualified_lead_count", &self.qualified_lead_count())?;
        s.serialize_field("win_rate", &self.win_rate())?;
        s.end()
    }
}

/// Stateless; cheap to copy into blocking tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsEngine;

impl MetricsEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&self, csv_data: &str) -> Result<PerformanceMetrics, MetricsError> {
        let mut lines = csv_data
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());

        let (_, header_line) = lines
            .next()
            .ok_or_else(|| MetricsError::Computation("no header row found".to_string()))?;
        let header: Vec<String> = split_csv_line(header_line)
            .map_err(|e| MetricsError::Computation(format!("header: {e}")))?
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !header.iter().any(|h| h == *c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MetricsError::Schema { missing });
        }

        let idx = |name: &str| header.iter().position(|h| h == name).unwrap_or_default();
        let columns = [idx(COL_NEW_LEADS), idx(COL_SIGN_OFFS), idx(COL_CLOSES)];
        let mut totals = [0.0f64; 3];
        let mut rows = 0usize;

        for (line_no, line) in lines {
            let fields = split_csv_line(line)
                .map_err(|e| MetricsError::Computation(format!("line {}: {e}", line_no + 1)))?;
            if fields.len() != header.len() {
                return Err(MetricsError::Computation(format!(
                    "line {}: expected {} fields, saw {}",
                    line_no + 1,
                    header.len(),
                    fields.len()
                )));
            }
            for (slot, &col) in columns.iter().enumerate() {
                totals[slot] += parse_count(&fields[col]).map_err(|e| {
                    MetricsError::Computation(format!(
                        "line {}, column '{}': {e}",
                        line_no + 1,
                        REQUIRED_COLUMNS[slot]
                    ))
                })?;
            }
            rows += 1;
        }

        let metrics = PerformanceMetrics::new(
            totals[0] as u64,
            totals[1] as u64,
            totals[2] as u64,
        );
        if !metrics.has_consistent_counts() {
            warn!(
                target: "performance",
                raw = metrics.raw_lead_count,
                lost = metrics.lost_leads,
                "lost leads exceed raw leads; check the upload"
            );
        }
        debug!(target: "performance", rows, ?metrics, "metrics computed");
        Ok(metrics)
    }
}

/// Empty cells count as zero; everything else must be a finite, non-negative number.
fn parse_count(cell: &str) -> Result<f64, String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = cell
        .parse()
        .map_err(|_| format!("could not convert '{cell}' to a number"))?;
    if !value.is_finite() {
        return Err(format!("non-finite value '{cell}'"));
    }
    if value < 0.0 {
        return Err(format!("negative count '{cell}'"));
    }
    Ok(value)
}

/// Minimal RFC 4180 field splitter: commas, double-quoted fields, `""` escapes.
fn split_csv_line(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_rate_rounds_to_three_decimals() {
        let m = PerformanceMetrics::new(3, 0, 1);
        assert_eq!(m.win_rate(), 0.333);
    }

    #[test]
    fn win_rate_ties_round_to_even() {
        assert_eq!(PerformanceMetrics::new(16, 0, 1).win_rate(), 0.062);
        assert_eq!(PerformanceMetrics::new(16, 0, 5).win_rate(), 0.312);
        assert_eq!(PerformanceMetrics::new(16, 0, 3).win_rate(), 0.188);
    }

    #[test]
    fn zero_leads_has_zero_win_rate() {
        let m = PerformanceMetrics::new(0, 0, 0);
        assert_eq!(m.win_rate(), 0.0);
        assert_eq!(m.qualified_lead_count(), 0);
    }

    #[test]
    fn inconsistent_counts_go_negative_without_error() {
        let m = PerformanceMetrics::new(5, 8, 1);
        assert_eq!(m.qualified_lead_count(), -3);
        assert!(!m.has_consistent_counts());
    }

    #[test]
    fn serialized_shape_includes_derived_values() {
        let v = serde_json::to_value(PerformanceMetrics::new(10, 2, 5)).unwrap();
        assert_eq!(v["qualified_lead_count"], serde_json::json!(8));
        assert_eq!(v["win_rate"], serde_json::json!(0.5));
        assert_eq!(v["raw_lead_count"], serde_json::json!(10));
    }

    #[test]
    fn splitter_handles_quotes_and_escapes() {
        let f = split_csv_line(r#"a,"b, c","say ""hi""",4"#).unwrap();
        assert_eq!(f, vec!["a", "b, c", "say \"hi\"", "4"]);
        assert!(split_csv_line(r#"a,"open"#).is_err());
    }

    #[test]
    fn header_whitespace_is_trimmed_but_case_matters() {
        let engine = MetricsEngine::new();
        let ok = engine.compute(" New Leads , SignOffs ,Closes \n4,1,2\n").unwrap();
        assert_eq!(ok, PerformanceMetrics::new(4, 1, 2));

        let err = engine.compute("new leads,SignOffs,Closes\n4,1,2\n").unwrap_err();
        match err {
            MetricsError::Schema { missing } => assert_eq!(missing, vec!["New Leads"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn float_cells_are_summed_then_truncated() {
        let engine = MetricsEngine::new();
        let m = engine
            .compute("New Leads,SignOffs,Closes\n1.5,0,0\n1.6,0,1\n\n")
            .unwrap();
        assert_eq!(m.raw_lead_count, 3);
        assert_eq!(m.closed_count, 1);
    }
}
