//! # Resilient Invoker
//! Wraps a single adapter call so that any failure (error, timeout) becomes
//! an empty result plus a log line. One attempt per request; no retries here.

use std::time::{Duration, Instant};

use metrics::{counter, histogram};

use crate::listing::Listing;
use crate::source::SourceAdapter;

/// Outcome of one adapter call.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceStatus {
    Ok,
    Failed(String),
    TimedOut,
}

/// Per-source provenance kept alongside the flattened listings.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub marketplace: String,
    pub status: SourceStatus,
    pub listings: Vec<Listing>,
    pub elapsed: Duration,
}

impl SourceReport {
    pub fn is_ok(&self) -> bool {
        self.status == SourceStatus::Ok
    }

    /// Report for a source whose task never produced a result (e.g. it panicked).
    pub fn failed(marketplace: impl Into<String>, reason: impl Into<String>) -> Self {
        let marketplace = marketplace.into();
        let reason = reason.into();
        record_failure(&marketplace, "failed", &reason);
        Self {
            marketplace,
            status: SourceStatus::Failed(reason),
            listings: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Call `adapter.scrape(query)` once, never propagating failure.
///
/// `timeout` bounds this call only; `None` waits as long as the adapter takes.
pub async fn invoke(
    adapter: &dyn SourceAdapter,
    query: &str,
    timeout: Option<Duration>,
) -> SourceReport {
    let marketplace = adapter.marketplace_name().to_string();
    let t0 = Instant::now();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, adapter.scrape(query)).await {
            Ok(res) => Some(res),
            Err(_) => None,
        },
        None => Some(adapter.scrape(query).await),
    };
    let elapsed = t0.elapsed();
    histogram!("aggregate_source_duration_ms", "marketplace" => marketplace.clone())
        .record(elapsed.as_secs_f64() * 1_000.0);

    let (status, listings) = match outcome {
        Some(Ok(listings)) => {
            tracing::debug!(
                marketplace = %marketplace,
                count = listings.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "source ok"
            );
            (SourceStatus::Ok, listings)
        }
        Some(Err(e)) => {
            let reason = format!("{e:#}");
            record_failure(&marketplace, "failed", &reason);
            (SourceStatus::Failed(reason), Vec::new())
        }
        None => {
            record_failure(&marketplace, "timeout", "timed out");
            (SourceStatus::TimedOut, Vec::new())
        }
    };

    SourceReport {
        marketplace,
        status,
        listings,
        elapsed,
    }
}

/// List-only form of [`invoke`].
pub async fn safe_scrape(
    adapter: &dyn SourceAdapter,
    query: &str,
    timeout: Option<Duration>,
) -> Vec<Listing> {
    invoke(adapter, query, timeout).await.listings
}

fn record_failure(marketplace: &str, kind: &'static str, reason: &str) {
    tracing::warn!(marketplace = %marketplace, kind, error = %reason, "source scrape failed");
    counter!(
        "aggregate_source_errors_total",
        "marketplace" => marketplace.to_string(),
        "kind" => kind
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::Utc;

    struct Broken;

    #[async_trait]
    impl SourceAdapter for Broken {
        fn marketplace_name(&self) -> &str {
            "Broken"
        }
        async fn scrape(&self, _query: &str) -> Result<Vec<Listing>> {
            Err(anyhow!("upstream returned 503"))
        }
    }

    struct Slow;

    #[async_trait]
    impl SourceAdapter for Slow {
        fn marketplace_name(&self) -> &str {
            "Slow"
        }
        async fn scrape(&self, _query: &str) -> Result<Vec<Listing>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![Listing::new("Slow", "late", 1.0, "https://slow.test", Utc::now())?])
        }
    }

    #[tokio::test]
    async fn error_becomes_empty_failed_report() {
        let r = invoke(&Broken, "anything", None).await;
        assert!(r.listings.is_empty());
        assert_eq!(r.marketplace, "Broken");
        match r.status {
            SourceStatus::Failed(reason) => assert!(reason.contains("503")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_scoped_to_the_call() {
        let r = invoke(&Slow, "q", Some(Duration::from_millis(50))).await;
        assert_eq!(r.status, SourceStatus::TimedOut);
        assert!(r.listings.is_empty());

        let ok = invoke(&Slow, "q", None).await;
        assert!(ok.is_ok());
        assert_eq!(ok.listings.len(), 1);
    }

    #[tokio::test]
    async fn safe_scrape_never_errors() {
        assert!(safe_scrape(&Broken, "q", None).await.is_empty());
    }
}
