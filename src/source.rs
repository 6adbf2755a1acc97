// src/source.rs
use anyhow::Result;

use crate::listing::Listing;

/// One external marketplace. Implementations may fail freely; the
/// aggregation core never assumes `scrape` succeeds.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn marketplace_name(&self) -> &str;
    async fn scrape(&self, query: &str) -> Result<Vec<Listing>>;
}
