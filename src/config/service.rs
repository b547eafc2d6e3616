// src/config/service.rs
//! Service-level knobs loaded from TOML with env overrides.
//!
//! Lookup order for the file: $SERVICE_CONFIG_PATH, then `config/service.toml`.
//! A missing file yields defaults. Env vars win over file values:
//! `POLICY_PATH`, `WORKER_PERMITS`, `CAPABILITY_TIMEOUT_SECS`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path, time::Duration};

use crate::policy::DEFAULT_POLICY_PATH;

pub const DEFAULT_SERVICE_CONFIG_PATH: &str = "config/service.toml";
pub const ENV_SERVICE_CONFIG_PATH: &str = "SERVICE_CONFIG_PATH";
pub const ENV_POLICY_PATH: &str = "POLICY_PATH";
pub const ENV_WORKER_PERMITS: &str = "WORKER_PERMITS";
pub const ENV_CAPABILITY_TIMEOUT_SECS: &str = "CAPABILITY_TIMEOUT_SECS";

fn default_policy_path() -> String {
    DEFAULT_POLICY_PATH.to_string()
}
fn default_worker_permits() -> usize {
    4
}
fn default_capability_timeout_secs() -> u64 {
    45
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_policy_path")]
    pub policy_path: String,
    /// Upper bound on concurrently running map-phase tasks, process-wide.
    #[serde(default = "default_worker_permits")]
    pub worker_permits: usize,
    /// Per-call limit for reasoning and rate-lookup capabilities.
    #[serde(default = "default_capability_timeout_secs")]
    pub capability_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            policy_path: default_policy_path(),
            worker_permits: default_worker_permits(),
            capability_timeout_secs: default_capability_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading service config from {}", path.display()))?;
        let cfg: ServiceConfig = toml::from_str(&content)
            .with_context(|| format!("parsing service config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load() -> Result<Self> {
        let path = env::var(ENV_SERVICE_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_SERVICE_CONFIG_PATH.to_string());
        let path = Path::new(&path);
        let mut cfg = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg.sanitized())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(p) = env::var(ENV_POLICY_PATH) {
            if !p.trim().is_empty() {
                self.policy_path = p;
            }
        }
        if let Some(n) = parse_env_num::<usize>(ENV_WORKER_PERMITS) {
            self.worker_permits = n;
        }
        if let Some(n) = parse_env_num::<u64>(ENV_CAPABILITY_TIMEOUT_SECS) {
            self.capability_timeout_secs = n;
        }
    }

    // Two map tasks per request need at least two permits to run side by side.
    fn sanitized(mut self) -> Self {
        self.worker_permits = self.worker_permits.max(2);
        if self.capability_timeout_secs == 0 {
            self.capability_timeout_secs = default_capability_timeout_secs();
        }
        self
    }

    pub fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.capability_timeout_secs)
    }
}

fn parse_env_num<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: ServiceConfig = toml::from_str(r#"worker_permits = 8"#).unwrap();
        assert_eq!(cfg.worker_permits, 8);
        assert_eq!(cfg.policy_path, DEFAULT_POLICY_PATH);
        assert_eq!(cfg.capability_timeout_secs, 45);
    }

    #[test]
    fn sanitize_enforces_minimums() {
        let cfg = ServiceConfig {
            policy_path: "p.json".into(),
            worker_permits: 0,
            capability_timeout_secs: 0,
        }
        .sanitized();
        assert_eq!(cfg.worker_permits, 2);
        assert_eq!(cfg.capability_timeout_secs, 45);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("service.toml");
        fs::write(&p, "policy_path = \"from_file.json\"\nworker_permits = 3\n").unwrap();

        env::set_var(ENV_SERVICE_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_WORKER_PERMITS, "6");
        let cfg = ServiceConfig::load().unwrap();
        assert_eq!(cfg.policy_path, "from_file.json");
        assert_eq!(cfg.worker_permits, 6);

        env::remove_var(ENV_SERVICE_CONFIG_PATH);
        env::remove_var(ENV_WORKER_PERMITS);
    }
}
