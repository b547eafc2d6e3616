// src/metrics.rs
//! Prometheus recorder and the `/metrics` route.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder on first call; later calls (tests building
    /// several routers in one process) reuse the same handle.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE.get_or_try_init(|| {
            let handle = PrometheusBuilder::new().install_recorder()?;
            describe();
            Ok::<_, anyhow::Error>(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    pub fn set_policy_windows(&self, count: usize) {
        gauge!("policy_windows_loaded").set(count as f64);
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("review_runs_total", "Reviews started");
    describe_counter!("review_init_failures_total", "Reviews that failed before the map phase");
    describe_counter!("review_map_failures_total", "Reviews stopped by a map phase error");
    describe_counter!("content_analysis_degraded_total", "Content analyses replaced by the sentinel");
    describe_counter!("synthesis_degraded_total", "Strategic reviews replaced by an error string");
    describe_counter!("rate_lookups_total", "Market rate lookups attempted");
    describe_histogram!("review_duration_ms", "End-to-end review latency in milliseconds");
    describe_gauge!("policy_windows_loaded", "Brand policy windows currently loaded");
}
