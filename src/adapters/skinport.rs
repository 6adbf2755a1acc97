//! Skinport exposes its whole catalog instead of a search endpoint, so the
//! catalog goes through a `SourceCache` and is filtered per query.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use serde::Deserialize;
use url::Url;

use crate::cache::{matches_query, SourceCache};
use crate::listing::Listing;
use crate::source::SourceAdapter;

pub const SKINPORT_ITEMS_URL: &str = "https://api.skinport.com/v1/items";
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    #[serde(default)]
    pub market_hash_name: String,
    pub currency: Option<String>,
    pub min_price: Option<f64>,
    /// Unix seconds
    pub updated_at: Option<i64>,
}

enum Upstream {
    Fixture(String),
    Http {
        client: reqwest::Client,
        url: String,
    },
}

pub struct SkinportAdapter {
    upstream: Upstream,
    cache: SourceCache<Vec<CatalogItem>>,
}

impl SkinportAdapter {
    pub fn from_fixture(body: &str, ttl: Duration) -> Self {
        Self {
            upstream: Upstream::Fixture(body.to_string()),
            cache: SourceCache::new("Skinport", ttl),
        }
    }

    pub fn http(client: reqwest::Client, ttl: Duration) -> Self {
        Self::http_with_url(client, SKINPORT_ITEMS_URL, ttl)
    }

    pub fn http_with_url(client: reqwest::Client, url: &str, ttl: Duration) -> Self {
        Self {
            upstream: Upstream::Http {
                client,
                url: url.to_string(),
            },
            cache: SourceCache::new("Skinport", ttl),
        }
    }

    pub fn catalog_cache(&self) -> &SourceCache<Vec<CatalogItem>> {
        &self.cache
    }

    /// The body must be a JSON array; entries that don't fit `CatalogItem`
    /// are dropped one by one.
    pub fn parse_catalog(body: &str) -> Result<Vec<CatalogItem>> {
        let raw: Vec<serde_json::Value> =
            serde_json::from_str(body).context("parsing skinport catalog json")?;
        let mut items = Vec::with_capacity(raw.len());
        for v in raw {
            match serde_json::from_value::<CatalogItem>(v) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::debug!(marketplace = "Skinport", error = %e, "skipping malformed record")
                }
            }
        }
        Ok(items)
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>> {
        match &self.upstream {
            Upstream::Fixture(body) => Self::parse_catalog(body),
            Upstream::Http { client, url } => {
                let resp = client
                    .get(url)
                    .query(&[("app_id", "730"), ("currency", "USD"), ("tradable", "0")])
                    .headers(browser_headers())
                    .send()
                    .await
                    .context("skinport http get()")?;
                let status = resp.status();
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    bail!("skinport api access denied: {status}");
                }
                let body = resp
                    .error_for_status()
                    .context("skinport http status")?
                    .text()
                    .await
                    .context("skinport http .text()")?;
                let items = Self::parse_catalog(&body)?;
                tracing::info!(marketplace = "Skinport", items = items.len(), "catalog fetched");
                Ok(items)
            }
        }
    }

    /// Filter `catalog` by `query` and normalize matches. Entries without a
    /// price are skipped.
    pub fn filter_catalog(catalog: &[CatalogItem], query: &str, now: DateTime<Utc>) -> Vec<Listing> {
        let mut out = Vec::new();
        for item in catalog {
            if !matches_query(&item.market_hash_name, query) {
                continue;
            }
            let Some(min_price) = item.min_price else {
                continue;
            };
            let last_updated = item
                .updated_at
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
                .unwrap_or(now);
            let link = match Url::parse_with_params(
                "https://skinport.com/market",
                &[("search", item.market_hash_name.as_str())],
            ) {
                Ok(u) => u,
                Err(e) => {
                    tracing::debug!(marketplace = "Skinport", error = %e, "skipping record");
                    continue;
                }
            };
            match Listing::new(
                "Skinport",
                item.market_hash_name.clone(),
                min_price,
                link.as_str(),
                last_updated,
            ) {
                Ok(l) => out.push(l.with_currency(item.currency.as_deref().unwrap_or("USD"))),
                Err(e) => tracing::debug!(marketplace = "Skinport", error = %e, "skipping record"),
            }
        }
        out
    }
}

fn browser_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    h.insert(ORIGIN, HeaderValue::from_static("https://skinport.com"));
    h.insert(REFERER, HeaderValue::from_static("https://skinport.com/"));
    h
}

#[async_trait]
impl SourceAdapter for SkinportAdapter {
    fn marketplace_name(&self) -> &str {
        "Skinport"
    }

    async fn scrape(&self, query: &str) -> Result<Vec<Listing>> {
        let catalog: Arc<Vec<CatalogItem>> =
            self.cache.get_or_refresh(|| self.fetch_catalog()).await?;
        Ok(Self::filter_catalog(&catalog, query, Utc::now()))
    }
}
