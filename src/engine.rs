//! # Deal Engine
//! query → response cache → fan-out → scoring → response shape.
//!
//! Aggregation never fails as a whole: if every source fails the caller gets
//! an empty response, not an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::Aggregator;
use crate::cache::{CacheStatus, ResponseCache};
use crate::listing::Listing;
use crate::scoring::{self, ScoringPolicy};

/// JSON body of a search. The two shapes are serialized without a tag.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Found {
        query: String,
        count: usize,
        best_deal: Listing,
        cheapest_listing: Listing,
        results: Vec<Listing>,
        generated_at: DateTime<Utc>,
    },
    Empty {
        query: String,
        total: usize,
        results: Vec<Listing>,
        generated_at: DateTime<Utc>,
    },
}

impl SearchResponse {
    /// Build from listings already ranked by the scoring engine.
    pub fn from_ranked(query: &str, ranked: Vec<Listing>, generated_at: DateTime<Utc>) -> Self {
        let query = query.to_string();
        let (best, cheapest) = match (ranked.first(), cheapest(&ranked)) {
            (Some(b), Some(c)) => (b.clone(), c.clone()),
            _ => {
                return SearchResponse::Empty {
                    query,
                    total: 0,
                    results: Vec::new(),
                    generated_at,
                }
            }
        };
        SearchResponse::Found {
            query,
            count: ranked.len(),
            best_deal: best,
            cheapest_listing: cheapest,
            results: ranked,
            generated_at,
        }
    }

    pub fn results(&self) -> &[Listing] {
        match self {
            SearchResponse::Found { results, .. } | SearchResponse::Empty { results, .. } => {
                results
            }
        }
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        match self {
            SearchResponse::Found { generated_at, .. }
            | SearchResponse::Empty { generated_at, .. } => *generated_at,
        }
    }
}

/// Minimum price; the earliest in ranked order wins a tie.
fn cheapest(ranked: &[Listing]) -> Option<&Listing> {
    ranked.iter().fold(None, |acc: Option<&Listing>, l| match acc {
        Some(c) if c.price() <= l.price() => Some(c),
        _ => Some(l),
    })
}

pub struct DealEngine {
    aggregator: Aggregator,
    policy: ScoringPolicy,
    cache: ResponseCache<SearchResponse>,
}

impl DealEngine {
    pub fn new(
        aggregator: Aggregator,
        policy: ScoringPolicy,
        cache: ResponseCache<SearchResponse>,
    ) -> Self {
        Self {
            aggregator,
            policy,
            cache,
        }
    }

    pub fn marketplaces(&self) -> Vec<String> {
        self.aggregator.marketplaces()
    }

    pub fn cache(&self) -> &ResponseCache<SearchResponse> {
        &self.cache
    }

    /// Aggregate + score without touching the response cache.
    pub async fn compute(&self, query: &str) -> SearchResponse {
        let query = query.trim();
        let agg = self.aggregator.aggregate(query).await;
        let now = Utc::now();
        let ranked = scoring::score_at(agg.listings, now, &self.policy);
        SearchResponse::from_ranked(query, ranked, now)
    }

    pub async fn search(&self, query: &str) -> (Arc<SearchResponse>, CacheStatus) {
        let (resp, status) = self
            .cache
            .get_or_compute(query, || self.compute(query))
            .await;
        tracing::debug!(
            query_len = query.chars().count(),
            cache = status.as_header(),
            results = resp.results().len(),
            "search served"
        );
        (resp, status)
    }
}
