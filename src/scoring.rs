//! # Deal Scoring
//! Pure ranking logic, no I/O.
//!
//! Per listing:
//! - price component: `K / max(price, 1)` (K = baseline, default 1000)
//! - freshness factor: `1 / (1 + ln(1 + age_minutes))`, age clamped at 0
//! - `raw_score = round(price_component * freshness, 2)`
//!
//! Output is sorted by score descending with a stable sort, so equal scores
//! keep their input order.

use chrono::{DateTime, Utc};

use crate::listing::Listing;

pub const DEFAULT_BASELINE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    pub baseline: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_BASELINE,
        }
    }
}

impl ScoringPolicy {
    pub fn new(baseline: f64) -> Self {
        Self { baseline }
    }
}

/// Lower price → higher score. Prices below 1 are floored to 1.
pub fn price_score(price: f64, baseline: f64) -> f64 {
    baseline / price.max(1.0)
}

/// Minutes between `last_updated` and `now`; future timestamps count as 0.
pub fn age_minutes(now: DateTime<Utc>, last_updated: DateTime<Utc>) -> f64 {
    let ms = now.signed_duration_since(last_updated).num_milliseconds();
    (ms as f64 / 60_000.0).max(0.0)
}

/// In (0, 1], exactly 1 at age 0, strictly decreasing.
pub fn freshness_factor(age_minutes: f64) -> f64 {
    1.0 / (1.0 + (1.0 + age_minutes.max(0.0)).ln())
}

pub fn deal_score(listing: &Listing, now: DateTime<Utc>, policy: &ScoringPolicy) -> f64 {
    let p = price_score(listing.price(), policy.baseline);
    let f = freshness_factor(age_minutes(now, listing.last_updated()));
    round2(p * f)
}

/// Score every listing against `now` and rank them.
pub fn score_at(
    mut listings: Vec<Listing>,
    now: DateTime<Utc>,
    policy: &ScoringPolicy,
) -> Vec<Listing> {
    for l in listings.iter_mut() {
        let s = deal_score(l, now, policy);
        l.set_raw_score(s);
    }
    // sort_by is stable
    listings.sort_by(|a, b| b.raw_score().total_cmp(&a.raw_score()));
    listings
}

pub fn score(listings: Vec<Listing>, policy: &ScoringPolicy) -> Vec<Listing> {
    score_at(listings, Utc::now(), policy)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
