// src/adapters/mod.rs
pub mod ebay;
pub mod skinport;
pub mod steam;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::AggregatorConfig;
use crate::source::SourceAdapter;

pub use ebay::EbayAdapter;
pub use skinport::SkinportAdapter;
pub use steam::SteamAdapter;

/// Names accepted in `sources = [...]`.
pub const KNOWN_SOURCES: &[&str] = &["steam", "skinport", "ebay"];

/// Shared HTTP client for every adapter (one connection pool).
pub fn build_http_client(cfg: &AggregatorConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .connect_timeout(Duration::from_secs(4))
        .timeout(cfg.adapter_timeout())
        .build()
        .context("building marketplace http client")
}

/// Map configured source names onto HTTP-backed adapters, keeping config order.
/// Unknown names are logged and ignored.
pub fn build_adapters(
    names: &[String],
    cfg: &AggregatorConfig,
    client: &reqwest::Client,
) -> Vec<Arc<dyn SourceAdapter>> {
    let mut out: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(names.len());
    for name in names {
        match name.trim().to_ascii_lowercase().as_str() {
            "steam" => out.push(Arc::new(SteamAdapter::http(client.clone()))),
            "skinport" => out.push(Arc::new(SkinportAdapter::http(
                client.clone(),
                cfg.source_cache_ttl(),
            ))),
            "ebay" => out.push(Arc::new(EbayAdapter::http(client.clone()))),
            other => tracing::warn!(source = other, known = ?KNOWN_SOURCES, "unknown source ignored"),
        }
    }
    out
}
