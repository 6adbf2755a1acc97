//! Per-adapter catalog cache for bulk-catalog upstreams.
//!
//! - Fresh entry (`now - fetched_at < ttl`) is served without touching the network.
//! - Stale or absent: exactly one refresh attempt. Success replaces the entry;
//!   failure keeps the previous entry (stale-but-available) or propagates if
//!   nothing was ever cached.
//! - At most one refresh in flight. Callers arriving during a refresh get the
//!   stale value immediately, or wait for the refresh when there is none. If
//!   that refresh was cancelled rather than failed, the waiter runs its own.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use metrics::counter;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry<T> {
    items: Arc<T>,
    fetched_at: Instant,
}

pub struct SourceCache<T> {
    name: String,
    ttl: Duration,
    entry: RwLock<Option<Entry<T>>>,
    refresh_gate: Mutex<()>,
    /// Refresh attempts that ran to completion, successful or not.
    attempts: AtomicU64,
}

impl<T: Send + Sync> SourceCache<T> {
    pub fn new(name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            ttl,
            entry: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current payload regardless of age.
    pub fn peek(&self) -> Option<Arc<T>> {
        let g = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        g.as_ref().map(|e| Arc::clone(&e.items))
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh().is_some()
    }

    fn fresh(&self) -> Option<Arc<T>> {
        let g = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        g.as_ref()
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.items))
    }

    fn store(&self, items: T) -> Arc<T> {
        let items = Arc::new(items);
        let mut g = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        *g = Some(Entry {
            items: Arc::clone(&items),
            fetched_at: Instant::now(),
        });
        items
    }

    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(items) = self.fresh() {
            return Ok(items);
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let _gate = match self.refresh_gate.try_lock() {
            Ok(g) => g,
            Err(_) => {
                // Refresh already in flight.
                if let Some(stale) = self.peek() {
                    return Ok(stale);
                }
                let gate = self.refresh_gate.lock().await;
                if let Some(items) = self.peek() {
                    return Ok(items);
                }
                if self.attempts.load(Ordering::Acquire) != seen {
                    return Err(anyhow!("{}: catalog unavailable (refresh failed)", self.name));
                }
                // The leader was dropped before finishing; nothing was tried.
                gate
            }
        };

        // Another caller may have refreshed between our check and the gate.
        if let Some(items) = self.fresh() {
            return Ok(items);
        }

        let outcome = refresh().await;
        self.attempts.fetch_add(1, Ordering::AcqRel);
        match outcome {
            Ok(items) => {
                counter!("source_cache_refreshes_total", "source" => self.name.clone())
                    .increment(1);
                tracing::info!(source = %self.name, "source cache refreshed");
                Ok(self.store(items))
            }
            Err(e) => {
                counter!("source_cache_refresh_errors_total", "source" => self.name.clone())
                    .increment(1);
                match self.peek() {
                    Some(stale) => {
                        let reason = format!("{e:#}");
                        tracing::warn!(
                            source = %self.name,
                            error = %reason,
                            "source cache refresh failed; serving stale catalog"
                        );
                        Ok(stale)
                    }
                    None => Err(e.context(format!("{}: catalog refresh failed", self.name))),
                }
            }
        }
    }
}

/// Case-insensitive substring containment of `query` in `name`.
pub fn matches_query(name: &str, query: &str) -> bool {
    name.to_lowercase().contains(&query.to_lowercase())
}
