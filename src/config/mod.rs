// src/config/mod.rs
//! Aggregator configuration: TOML file + environment overrides.
//!
//! Load order:
//! 1) `$AGGREGATOR_CONFIG_PATH` (must exist if set)
//! 2) `config/aggregator.toml`
//! 3) built-in defaults
//!
//! Env overrides applied afterwards: `RESPONSE_CACHE_TTL_MS`,
//! `SOURCE_CACHE_TTL_SECS`, `SCORE_BASELINE`, `ADAPTER_TIMEOUT_MS`,
//! `AGGREGATOR_SOURCES` (comma separated).

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";

pub const ENV_RESPONSE_TTL_MS: &str = "RESPONSE_CACHE_TTL_MS";
pub const ENV_SOURCE_TTL_SECS: &str = "SOURCE_CACHE_TTL_SECS";
pub const ENV_SCORE_BASELINE: &str = "SCORE_BASELINE";
pub const ENV_ADAPTER_TIMEOUT_MS: &str = "ADAPTER_TIMEOUT_MS";
pub const ENV_SOURCES: &str = "AGGREGATOR_SOURCES";

fn default_score_baseline() -> f64 {
    1000.0
}
fn default_response_ttl_ms() -> u64 {
    60_000
}
fn default_source_cache_ttl_secs() -> u64 {
    300
}
fn default_adapter_timeout_ms() -> u64 {
    10_000
}
fn default_min_query_len() -> usize {
    2
}
fn default_sources() -> Vec<String> {
    vec!["steam".into(), "skinport".into(), "ebay".into()]
}
fn default_metrics() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_score_baseline")]
    pub score_baseline: f64,
    #[serde(default = "default_response_ttl_ms")]
    pub response_ttl_ms: u64,
    #[serde(default = "default_source_cache_ttl_secs")]
    pub source_cache_ttl_secs: u64,
    #[serde(default = "default_adapter_timeout_ms")]
    pub adapter_timeout_ms: u64,
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    /// Expose `/metrics`.
    #[serde(default = "default_metrics")]
    pub metrics: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            score_baseline: default_score_baseline(),
            response_ttl_ms: default_response_ttl_ms(),
            source_cache_ttl_secs: default_source_cache_ttl_secs(),
            adapter_timeout_ms: default_adapter_timeout_ms(),
            min_query_len: default_min_query_len(),
            sources: default_sources(),
            metrics: default_metrics(),
        }
    }
}

impl AggregatorConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading aggregator config from {}", path.display()))?;
        let cfg: AggregatorConfig = toml::from_str(&content)
            .with_context(|| format!("parsing aggregator config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// File (env path → default path → built-ins), then env overrides.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        Ok(base.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<u64>(ENV_RESPONSE_TTL_MS) {
            self.response_ttl_ms = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_SOURCE_TTL_SECS) {
            self.source_cache_ttl_secs = v;
        }
        if let Some(v) = env_parse::<f64>(ENV_SCORE_BASELINE) {
            self.score_baseline = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_ADAPTER_TIMEOUT_MS) {
            self.adapter_timeout_ms = v;
        }
        if let Ok(list) = std::env::var(ENV_SOURCES) {
            self.sources = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        self.sanitized()
    }

    /// Replace out-of-range values with defaults.
    fn sanitized(mut self) -> Self {
        if !self.score_baseline.is_finite() || self.score_baseline <= 0.0 {
            self.score_baseline = default_score_baseline();
        }
        if self.response_ttl_ms == 0 {
            self.response_ttl_ms = default_response_ttl_ms();
        }
        if self.source_cache_ttl_secs == 0 {
            self.source_cache_ttl_secs = default_source_cache_ttl_secs();
        }
        if self.adapter_timeout_ms == 0 {
            self.adapter_timeout_ms = default_adapter_timeout_ms();
        }
        self
    }

    pub fn response_ttl(&self) -> Duration {
        Duration::from_millis(self.response_ttl_ms)
    }

    pub fn source_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.source_cache_ttl_secs)
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn clear_env() {
        for k in [
            ENV_CONFIG_PATH,
            ENV_RESPONSE_TTL_MS,
            ENV_SOURCE_TTL_SECS,
            ENV_SCORE_BASELINE,
            ENV_ADAPTER_TIMEOUT_MS,
            ENV_SOURCES,
        ] {
            env::remove_var(k);
        }
    }

    #[test]
    fn partial_toml_keeps_defaults_and_sanitizes() {
        let cfg: AggregatorConfig =
            toml::from_str("response_ttl_ms = 5000\nscore_baseline = -3.0").unwrap();
        let cfg = cfg.sanitized();
        assert_eq!(cfg.response_ttl_ms, 5000);
        assert_eq!(cfg.score_baseline, 1000.0);
        assert_eq!(cfg.source_cache_ttl_secs, 300);
        assert_eq!(cfg.min_query_len, 2);
        assert_eq!(cfg.sources, vec!["steam", "skinport", "ebay"]);
    }

    #[serial_test::serial]
    #[test]
    fn env_path_then_overrides() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("agg.toml");
        fs::write(&p, "sources = [\"steam\"]\nadapter_timeout_ms = 2500\n").unwrap();

        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_RESPONSE_TTL_MS, "1500");
        env::set_var(ENV_SOURCES, "ebay, skinport,");
        let cfg = AggregatorConfig::load_default().unwrap();
        assert_eq!(cfg.adapter_timeout(), Duration::from_millis(2500));
        assert_eq!(cfg.response_ttl(), Duration::from_millis(1500));
        assert_eq!(cfg.sources, vec!["ebay", "skinport"]);
        clear_env();
    }

    #[serial_test::serial]
    #[test]
    fn missing_env_path_is_an_error() {
        clear_env();
        env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
        assert!(AggregatorConfig::load_default().is_err());
        clear_env();
    }
}
