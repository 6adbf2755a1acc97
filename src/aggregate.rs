//! # Aggregation Orchestrator
//! Fans a query out to every registered adapter at once, waits for all of
//! them, and flattens the results. Cross-source order is not meaningful;
//! the scoring engine re-establishes order afterwards.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use crate::invoker::{self, SourceReport};
use crate::listing::Listing;
use crate::source::SourceAdapter;

/// Result of one fan-out. `reports[i]` belongs to `adapters[i]`.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub listings: Vec<Listing>,
    pub reports: Vec<SourceReport>,
}

impl Aggregation {
    pub fn failed_sources(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| r.marketplace.as_str())
            .collect()
    }
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    per_source_timeout: Option<Duration>,
}

impl Aggregator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self {
            adapters,
            per_source_timeout: None,
        }
    }

    /// Bound each adapter call (not the whole fan-out).
    pub fn with_timeout(mut self, per_source_timeout: Duration) -> Self {
        self.per_source_timeout = Some(per_source_timeout);
        self
    }

    pub fn marketplaces(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|a| a.marketplace_name().to_string())
            .collect()
    }

    pub async fn aggregate(&self, query: &str) -> Aggregation {
        counter!("aggregate_runs_total").increment(1);

        // One task per adapter so a panicking adapter only loses its own results.
        let handles = self
            .adapters
            .iter()
            .map(|adapter| {
                let adapter = Arc::clone(adapter);
                let query = query.to_string();
                let timeout = self.per_source_timeout;
                tokio::spawn(async move { invoker::invoke(adapter.as_ref(), &query, timeout).await })
            })
            .collect::<Vec<_>>();

        let joined = futures::future::join_all(handles).await;

        let mut reports = Vec::with_capacity(joined.len());
        for (adapter, res) in self.adapters.iter().zip(joined) {
            match res {
                Ok(report) => reports.push(report),
                Err(e) => reports.push(SourceReport::failed(
                    adapter.marketplace_name(),
                    format!("adapter task aborted: {e}"),
                )),
            }
        }

        let listings = reports
            .iter()
            .flat_map(|r| r.listings.iter().cloned())
            .collect::<Vec<_>>();

        let out = Aggregation { listings, reports };
        tracing::info!(
            query_len = query.chars().count(),
            sources = out.reports.len(),
            listings = out.listings.len(),
            failed = ?out.failed_sources(),
            "aggregation finished"
        );
        out
    }
}

/// Fan out to `adapters` without per-call timeouts and return the flat list.
pub async fn aggregate(query: &str, adapters: &[Arc<dyn SourceAdapter>]) -> Vec<Listing> {
    Aggregator::new(adapters.to_vec())
        .aggregate(query)
        .await
        .listings
}
