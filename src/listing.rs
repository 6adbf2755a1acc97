//! # Listing
//! Normalized record every source adapter produces.
//!
//! Construction validates the record; after that the only mutable field is
//! `raw_score`, and only the scoring engine writes it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Why a single upstream record could not become a `Listing`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ListingError {
    #[error("marketplace identifier is empty")]
    EmptyMarketplace,
    #[error("invalid price: {0}")]
    InvalidPrice(f64),
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    marketplace: String,
    item_name: String,
    price: f64,
    currency: String,
    url: Url,
    last_updated: DateTime<Utc>,
    raw_score: f64,
}

impl Listing {
    pub fn new(
        marketplace: impl Into<String>,
        item_name: impl Into<String>,
        price: f64,
        url: &str,
        last_updated: DateTime<Utc>,
    ) -> Result<Self, ListingError> {
        let marketplace = marketplace.into().trim().to_string();
        if marketplace.is_empty() {
            return Err(ListingError::EmptyMarketplace);
        }
        if !price.is_finite() || price < 0.0 {
            return Err(ListingError::InvalidPrice(price));
        }
        let url = Url::parse(url).map_err(|e| ListingError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            marketplace,
            item_name: item_name.into(),
            price,
            currency: DEFAULT_CURRENCY.to_string(),
            url,
            last_updated,
            raw_score: 0.0,
        })
    }

    /// Override the currency code. Blank input keeps the default.
    pub fn with_currency(mut self, currency: &str) -> Self {
        let c = currency.trim();
        if !c.is_empty() {
            self.currency = c.to_ascii_uppercase();
        }
        self
    }

    pub fn marketplace(&self) -> &str {
        &self.marketplace
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Meaningless until the listing went through `scoring::score`.
    pub fn raw_score(&self) -> f64 {
        self.raw_score
    }

    pub(crate) fn set_raw_score(&mut self, score: f64) {
        self.raw_score = score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-09-06T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn valid_listing_defaults_to_usd_and_zero_score() {
        let l = Listing::new("Steam", "Portal 2", 9.99, "https://example.test/p2", at()).unwrap();
        assert_eq!(l.currency(), "USD");
        assert_eq!(l.raw_score(), 0.0);
        assert_eq!(l.marketplace(), "Steam");
    }

    #[test]
    fn rejects_negative_and_nan_prices() {
        let neg = Listing::new("eBay", "x", -1.0, "https://example.test", at());
        assert_eq!(neg, Err(ListingError::InvalidPrice(-1.0)));
        let nan = Listing::new("eBay", "x", f64::NAN, "https://example.test", at());
        assert!(matches!(nan, Err(ListingError::InvalidPrice(_))));
    }

    #[test]
    fn rejects_blank_marketplace_and_relative_url() {
        assert_eq!(
            Listing::new("   ", "x", 1.0, "https://example.test", at()),
            Err(ListingError::EmptyMarketplace)
        );
        assert!(matches!(
            Listing::new("eBay", "x", 1.0, "/itm/123", at()),
            Err(ListingError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn currency_override_ignores_blank() {
        let l = Listing::new("Skinport", "AK", 1.0, "https://example.test", at())
            .unwrap()
            .with_currency("eur");
        assert_eq!(l.currency(), "EUR");
        let l = l.with_currency("  ");
        assert_eq!(l.currency(), "EUR");
    }

    #[test]
    fn serializes_timestamp_as_rfc3339() {
        let l = Listing::new("Steam", "Portal 2", 9.99, "https://example.test/p2", at()).unwrap();
        let v = serde_json::to_value(&l).unwrap();
        assert_eq!(v["last_updated"], "2025-09-06T09:00:00Z");
        assert_eq!(v["url"], "https://example.test/p2");
        assert_eq!(v["raw_score"], 0.0);
    }
}
