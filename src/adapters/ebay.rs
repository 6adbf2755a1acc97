// src/adapters/ebay.rs
//! eBay search results page (HTML). Each result card is parsed on its own;
//! a card that fails to parse is skipped without affecting the rest.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::listing::Listing;
use crate::source::SourceAdapter;

pub const EBAY_SEARCH_URL: &str = "https://www.ebay.com/sch/i.html";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static RE_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)").expect("price regex"));

struct Selectors {
    card: Selector,
    title: Selector,
    price: Selector,
    link: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    card: Selector::parse(".s-item__wrapper").expect("card selector"),
    title: Selector::parse(".s-item__title").expect("title selector"),
    price: Selector::parse(".s-item__price").expect("price selector"),
    link: Selector::parse(".s-item__link").expect("link selector"),
});

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        url: String,
    },
}

pub struct EbayAdapter {
    mode: Mode,
}

impl EbayAdapter {
    pub fn from_fixture(html: &str) -> Self {
        Self {
            mode: Mode::Fixture(html.to_string()),
        }
    }

    pub fn http(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                client,
                url: EBAY_SEARCH_URL.to_string(),
            },
        }
    }

    pub fn parse(html: &str, fetched_at: DateTime<Utc>) -> Vec<Listing> {
        let doc = Html::parse_document(html);
        doc.select(&SELECTORS.card)
            .filter_map(|card| parse_card(card, fetched_at))
            .collect()
    }
}

fn parse_card(card: ElementRef<'_>, fetched_at: DateTime<Utc>) -> Option<Listing> {
    let name = text_of(card, &SELECTORS.title)?;
    // Placeholder card eBay puts first on every results page.
    if name.contains("Shop on eBay") {
        return None;
    }
    let price = parse_price(&text_of(card, &SELECTORS.price)?)?;
    let href = card.select(&SELECTORS.link).next()?.value().attr("href")?;

    match Listing::new("eBay", name, price, href, fetched_at) {
        Ok(l) => Some(l),
        Err(e) => {
            tracing::debug!(marketplace = "eBay", error = %e, "skipping card");
            None
        }
    }
}

fn text_of(card: ElementRef<'_>, sel: &Selector) -> Option<String> {
    let t = card
        .select(sel)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let t = t.split_whitespace().collect::<Vec<_>>().join(" ");
    (!t.is_empty()).then_some(t)
}

/// `"$1,025.00 to $1,300.00"` → `1025.0` (lower bound of a range).
pub fn parse_price(text: &str) -> Option<f64> {
    let lower = text.split(" to ").next()?;
    let m = RE_PRICE.find(lower)?;
    m.as_str().replace(',', "").parse::<f64>().ok()
}

#[async_trait]
impl SourceAdapter for EbayAdapter {
    fn marketplace_name(&self) -> &str {
        "eBay"
    }

    async fn scrape(&self, query: &str) -> Result<Vec<Listing>> {
        match &self.mode {
            Mode::Fixture(html) => Ok(Self::parse(html, Utc::now())),
            Mode::Http { client, url } => {
                let body = client
                    .get(url)
                    .query(&[("_nkw", query)])
                    .header(reqwest::header::USER_AGENT, USER_AGENT)
                    .send()
                    .await
                    .context("ebay http get()")?
                    .error_for_status()
                    .context("ebay http status")?
                    .text()
                    .await
                    .context("ebay http .text()")?;
                Ok(Self::parse(&body, Utc::now()))
            }
        }
    }
}
