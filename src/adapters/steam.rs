// src/adapters/steam.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::listing::Listing;
use crate::source::SourceAdapter;

pub const STEAM_SEARCH_URL: &str = "https://store.steampowered.com/api/storesearch/";

#[derive(Debug, Deserialize)]
struct SearchResp {
    /// Kept raw so one malformed record doesn't sink the batch.
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: Option<u64>,
    name: Option<String>,
    price: Option<Price>,
}

#[derive(Debug, Deserialize)]
struct Price {
    /// Cents, e.g. 2999 = $29.99
    #[serde(rename = "final")]
    final_cents: Option<i64>,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        url: String,
    },
}

/// Steam store search (per-query JSON endpoint).
pub struct SteamAdapter {
    mode: Mode,
}

impl SteamAdapter {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn http(client: reqwest::Client) -> Self {
        Self::http_with_url(client, STEAM_SEARCH_URL)
    }

    pub fn http_with_url(client: reqwest::Client, url: &str) -> Self {
        Self {
            mode: Mode::Http {
                client,
                url: url.to_string(),
            },
        }
    }

    /// Parse a search response body. Records that are missing `id`/`name` or
    /// don't match the expected shape are skipped.
    pub fn parse(body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Listing>> {
        let resp: SearchResp = serde_json::from_str(body).context("parsing steam search json")?;
        let mut out = Vec::with_capacity(resp.items.len());
        for raw in resp.items {
            let it: Item = match serde_json::from_value(raw) {
                Ok(it) => it,
                Err(e) => {
                    tracing::debug!(marketplace = "Steam", error = %e, "skipping malformed record");
                    continue;
                }
            };
            let (Some(id), Some(name)) = (it.id, it.name) else {
                continue;
            };
            let cents = it.price.and_then(|p| p.final_cents).unwrap_or(0);
            let price = if cents > 0 { cents as f64 / 100.0 } else { 0.0 };
            let link = format!("https://store.steampowered.com/app/{id}/");
            match Listing::new("Steam", name, price, &link, fetched_at) {
                Ok(l) => out.push(l),
                Err(e) => tracing::debug!(marketplace = "Steam", error = %e, "skipping record"),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for SteamAdapter {
    fn marketplace_name(&self) -> &str {
        "Steam"
    }

    async fn scrape(&self, query: &str) -> Result<Vec<Listing>> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse(body, Utc::now()),
            Mode::Http { client, url } => {
                let body = client
                    .get(url)
                    .query(&[("term", query), ("l", "english"), ("cc", "US")])
                    .send()
                    .await
                    .context("steam http get()")?
                    .error_for_status()
                    .context("steam http status")?
                    .text()
                    .await
                    .context("steam http .text()")?;
                Self::parse(&body, Utc::now())
            }
        }
    }
}
