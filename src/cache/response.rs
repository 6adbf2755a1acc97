//! Short-TTL cache for whole aggregated + scored responses.
//!
//! Keyed by the trimmed query exactly as supplied. Concurrent misses for the
//! same key coalesce into one computation; while a key is recomputing, other
//! callers get the expired value if there is one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Stale,
}

impl CacheStatus {
    pub fn as_header(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Stale => "STALE",
        }
    }
}

struct Entry<V> {
    value: Arc<V>,
    expires_at: Instant,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    gates: HashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl<V> Inner<V> {
    /// Drop gates nobody holds any more. A caller whose future was dropped
    /// mid-compute never reaches `store`, so its gate is only reclaimed here.
    /// Gates are only cloned under the map lock, so a count of one is final.
    fn prune_gates(&mut self) {
        self.gates.retain(|_, gate| Arc::strong_count(gate) > 1);
    }
}

pub struct ResponseCache<V> {
    ttl: Duration,
    inner: Mutex<Inner<V>>,
}

impl<V: Send + Sync> ResponseCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                gates: HashMap::new(),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key_for(query: &str) -> String {
        query.trim().to_string()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `(fresh value, expired value)` for `key`, at most one of them set.
    fn lookup(&self, key: &str) -> (Option<Arc<V>>, Option<Arc<V>>) {
        let g = self.lock();
        match g.entries.get(key) {
            Some(e) if Instant::now() < e.expires_at => (Some(Arc::clone(&e.value)), None),
            Some(e) => (None, Some(Arc::clone(&e.value))),
            None => (None, None),
        }
    }

    fn gate(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut g = self.lock();
        g.prune_gates();
        Arc::clone(g.gates.entry(key.to_string()).or_default())
    }

    fn store(&self, key: String, value: Arc<V>) {
        let now = Instant::now();
        let mut g = self.lock();
        g.entries.retain(|_, e| now < e.expires_at);
        g.gates.remove(&key);
        g.prune_gates();
        g.entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub async fn get_or_compute<F, Fut>(&self, query: &str, compute: F) -> (Arc<V>, CacheStatus)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let key = Self::key_for(query);

        let (fresh, stale) = self.lookup(&key);
        if let Some(v) = fresh {
            counter!("response_cache_hits_total").increment(1);
            return (v, CacheStatus::Hit);
        }

        let gate = self.gate(&key);
        let _guard = match gate.try_lock() {
            Ok(g) => g,
            Err(_) => {
                if let Some(v) = stale {
                    counter!("response_cache_stale_total").increment(1);
                    return (v, CacheStatus::Stale);
                }
                gate.lock().await
            }
        };

        // A coalesced waiter finds the value its leader just stored.
        if let (Some(v), _) = self.lookup(&key) {
            counter!("response_cache_hits_total").increment(1);
            return (v, CacheStatus::Hit);
        }

        counter!("response_cache_misses_total").increment(1);
        let value = Arc::new(compute().await);
        self.store(key, Arc::clone(&value));
        (value, CacheStatus::Miss)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut g = self.lock();
        g.prune_gates();
        let before = g.entries.len();
        g.entries.retain(|_, e| now < e.expires_at);
        before - g.entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys with a computation gate currently tracked.
    pub fn pending_gates(&self) -> usize {
        self.lock().gates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_trimmed_but_not_case_folded() {
        assert_eq!(ResponseCache::<u8>::key_for("  ak-47 "), "ak-47");
        assert_ne!(
            ResponseCache::<u8>::key_for("AK-47"),
            ResponseCache::<u8>::key_for("ak-47")
        );
    }

    #[test]
    fn header_values() {
        assert_eq!(CacheStatus::Hit.as_header(), "HIT");
        assert_eq!(CacheStatus::Miss.as_header(), "MISS");
        assert_eq!(CacheStatus::Stale.as_header(), "STALE");
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_compute_does_not_leak_its_gate() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let dropped = tokio::time::timeout(
            Duration::from_millis(10),
            cache.get_or_compute("gone", || std::future::pending::<u8>()),
        )
        .await;
        assert!(dropped.is_err());
        assert_eq!(cache.pending_gates(), 1);

        // The next miss sweeps it; its own gate is released on store.
        let (v, status) = cache.get_or_compute("other", || async { 7u8 }).await;
        assert_eq!((*v, status), (7, CacheStatus::Miss));
        assert_eq!(cache.pending_gates(), 0);

        // Idle sweep path.
        let _ = tokio::time::timeout(
            Duration::from_millis(10),
            cache.get_or_compute("gone again", || std::future::pending::<u8>()),
        )
        .await;
        cache.purge_expired();
        assert_eq!(cache.pending_gates(), 0);

        // A dropped leader doesn't wedge the key.
        let (v, status) = cache.get_or_compute("gone", || async { 9u8 }).await;
        assert_eq!((*v, status), (9, CacheStatus::Miss));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.get_or_compute("old", || async { 1u8 }).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        cache.get_or_compute("new", || async { 2u8 }).await;
        // storing "new" already swept "old"
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(), 0);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }
}
