// tests/aggregate_isolation.rs
//
// Fan-out behavior: failure isolation, concurrency, per-source timeouts.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use deal_aggregator::invoker::SourceStatus;
use deal_aggregator::{aggregate, Aggregator, Listing, SourceAdapter};

struct AlwaysFails;

#[async_trait]
impl SourceAdapter for AlwaysFails {
    fn marketplace_name(&self) -> &str {
        "AlwaysFails"
    }
    async fn scrape(&self, _query: &str) -> Result<Vec<Listing>> {
        Err(anyhow!("connection reset by peer"))
    }
}

struct Fixed {
    name: &'static str,
    count: usize,
    delay: Duration,
}

#[async_trait]
impl SourceAdapter for Fixed {
    fn marketplace_name(&self) -> &str {
        self.name
    }
    async fn scrape(&self, query: &str) -> Result<Vec<Listing>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (0..self.count)
            .map(|i| {
                Listing::new(
                    self.name,
                    format!("{query} #{i}"),
                    10.0 + i as f64,
                    &format!("https://{}.test/{i}", self.name.to_lowercase()),
                    Utc::now(),
                )
                .map_err(Into::into)
            })
            .collect()
    }
}

fn fixed(name: &'static str, count: usize, delay_ms: u64) -> Arc<dyn SourceAdapter> {
    Arc::new(Fixed {
        name,
        count,
        delay: Duration::from_millis(delay_ms),
    })
}

#[tokio::test]
async fn failing_adapter_does_not_reduce_the_others() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(AlwaysFails), fixed("Good", 3, 0)];
    let out = aggregate("lamp", &adapters).await;
    assert_eq!(out.len(), 3);
    assert!(out.iter().all(|l| l.marketplace() == "Good"));
}

#[tokio::test]
async fn all_failing_is_empty_not_error() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(AlwaysFails), Arc::new(AlwaysFails)];
    let agg = Aggregator::new(adapters).aggregate("lamp").await;
    assert!(agg.listings.is_empty());
    assert_eq!(agg.reports.len(), 2);
    assert_eq!(agg.failed_sources(), vec!["AlwaysFails", "AlwaysFails"]);
}

#[tokio::test(start_paused = true)]
async fn sources_run_concurrently() {
    let adapters = vec![fixed("A", 1, 1_000), fixed("B", 1, 1_000), fixed("C", 1, 1_000)];
    let t0 = tokio::time::Instant::now();
    let agg = Aggregator::new(adapters).aggregate("lamp").await;
    let took = t0.elapsed();
    assert_eq!(agg.listings.len(), 3);
    // Bounded by the slowest source, not the sum.
    assert!(took < Duration::from_millis(1_500), "took {took:?}");
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out_without_cutting_the_others() {
    let adapters = vec![fixed("Fast", 2, 10), fixed("Stuck", 5, 60_000)];
    let agg = Aggregator::new(adapters)
        .with_timeout(Duration::from_secs(2))
        .aggregate("lamp")
        .await;
    assert_eq!(agg.listings.len(), 2);
    assert_eq!(agg.reports[0].status, SourceStatus::Ok);
    assert_eq!(agg.reports[1].status, SourceStatus::TimedOut);
}

#[tokio::test]
async fn reports_follow_adapter_order_not_completion_order() {
    let adapters = vec![fixed("Slow", 1, 50), fixed("Quick", 2, 0)];
    let agg = Aggregator::new(adapters).aggregate("lamp").await;
    let names = agg
        .reports
        .iter()
        .map(|r| r.marketplace.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Slow", "Quick"]);
    assert_eq!(agg.reports[1].listings.len(), 2);
}
