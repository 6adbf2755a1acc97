// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod adapters;
pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod invoker;
pub mod listing;
pub mod metrics;
pub mod scoring;
pub mod source;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{aggregate, Aggregation, Aggregator};
pub use crate::api::router;
pub use crate::engine::{DealEngine, SearchResponse};
pub use crate::listing::{Listing, ListingError};
pub use crate::scoring::ScoringPolicy;
pub use crate::source::SourceAdapter;

use axum::Router;
use tracing::info;

use crate::api::AppState;
use crate::cache::ResponseCache;
use crate::config::AggregatorConfig;

/// Wire the engine for `cfg` with HTTP-backed adapters.
pub fn engine_from_config(cfg: &AggregatorConfig) -> anyhow::Result<DealEngine> {
    let client = adapters::build_http_client(cfg)?;
    let adapters = adapters::build_adapters(&cfg.sources, cfg, &client);
    let aggregator = Aggregator::new(adapters).with_timeout(cfg.adapter_timeout());
    Ok(DealEngine::new(
        aggregator,
        ScoringPolicy::new(cfg.score_baseline),
        ResponseCache::new(cfg.response_ttl()),
    ))
}

/// Build the full in-process app from config files + env.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AggregatorConfig::load_default()?;
    app_with_config(cfg)
}

pub fn app_with_config(cfg: AggregatorConfig) -> anyhow::Result<Router> {
    let engine = engine_from_config(&cfg)?;
    info!(
        sources = ?engine.marketplaces(),
        response_ttl_ms = cfg.response_ttl_ms,
        source_cache_ttl_secs = cfg.source_cache_ttl_secs,
        adapter_timeout_ms = cfg.adapter_timeout_ms,
        "deal aggregator configured"
    );

    let mut router = api::router(AppState::new(engine, cfg.min_query_len));
    if cfg.metrics {
        let m = metrics::Metrics::init(cfg.response_ttl_ms)?;
        router = router.merge(m.router());
    }
    Ok(router)
}
