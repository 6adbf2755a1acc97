// tests/metrics.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use deal_aggregator::cache::ResponseCache;
use deal_aggregator::metrics::Metrics;
use deal_aggregator::{Aggregator, DealEngine, Listing, ScoringPolicy, SourceAdapter};
use tower::ServiceExt;

struct Flaky;

#[async_trait]
impl SourceAdapter for Flaky {
    fn marketplace_name(&self) -> &str {
        "Flaky"
    }
    async fn scrape(&self, _query: &str) -> Result<Vec<Listing>> {
        anyhow::bail!("parse error: unexpected token")
    }
}

struct Steady;

#[async_trait]
impl SourceAdapter for Steady {
    fn marketplace_name(&self) -> &str {
        "Steady"
    }
    async fn scrape(&self, query: &str) -> Result<Vec<Listing>> {
        Ok(vec![Listing::new("Steady", query, 3.0, "https://steady.test/1", Utc::now())?])
    }
}

#[tokio::test]
async fn metrics_endpoint_exposes_cache_and_source_series() {
    let m = Metrics::init(60_000).expect("install recorder");
    // Second init in the same process reuses the recorder.
    let m2 = Metrics::init(60_000).expect("reuse recorder");

    let engine = DealEngine::new(
        Aggregator::new(vec![Arc::new(Flaky), Arc::new(Steady)]),
        ScoringPolicy::default(),
        ResponseCache::new(Duration::from_secs(60)),
    );
    engine.search("widget").await;
    engine.search("widget").await;

    let resp = m2
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "response_cache_ttl_ms",
        "response_cache_misses_total",
        "response_cache_hits_total",
        "aggregate_source_errors_total",
        "aggregate_runs_total",
    ] {
        assert!(text.contains(needle), "metrics exposition missing '{needle}'\n{text}");
    }
    assert!(text.contains("marketplace=\"Flaky\""), "{text}");
    drop(m);
}
