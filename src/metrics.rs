use anyhow::{anyhow, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// The recorder is process-global; installed on first use.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once) and publish the response cache TTL.
    pub fn init(response_ttl_ms: u64) -> Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new()
                    .install_recorder()
                    .map_err(|e| anyhow!("prometheus: install recorder: {e}"))?;
                describe_all();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();

        // Absolute TTL, no sliding refresh
        gauge!("response_cache_ttl_ms").set(response_ttl_ms as f64);

        Ok(Self { handle })
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

fn describe_all() {
    describe_counter!("aggregate_runs_total", "Fan-outs started.");
    describe_counter!(
        "aggregate_source_errors_total",
        "Adapter calls that failed or timed out, by marketplace and kind."
    );
    describe_histogram!(
        "aggregate_source_duration_ms",
        "Adapter call duration in milliseconds."
    );
    describe_counter!("source_cache_refreshes_total", "Successful catalog refreshes.");
    describe_counter!(
        "source_cache_refresh_errors_total",
        "Failed catalog refreshes (stale data kept when available)."
    );
    describe_counter!("response_cache_hits_total", "Searches served from cache.");
    describe_counter!("response_cache_misses_total", "Searches that ran a fan-out.");
    describe_counter!(
        "response_cache_stale_total",
        "Searches served an expired response while it was recomputing."
    );
    describe_gauge!("response_cache_ttl_ms", "Response cache TTL in milliseconds.");
}
