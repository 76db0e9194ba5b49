//! Keyed in-memory TTL memo.
//!
//! Entries expire lazily on read. Writers that need fresh data call
//! [`TtlCache::invalidate`] or [`TtlCache::invalidate_prefix`]; nothing
//! invalidates implicitly, so readers may see data up to one TTL old.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::metrics::CACHE_LOOKUPS;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    store: Arc<DashMap<String, CacheEntry<V>>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            store: Arc::new(DashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let (hit, expired) = match self.store.get(key) {
            Some(entry) if !entry.is_expired(now) => (Some(entry.value.clone()), false),
            Some(_) => (None, true),
            None => (None, false),
        };
        // The read guard must be released before removing from the same shard.
        if expired {
            self.store.remove_if(key, |_, entry| entry.is_expired(now));
        }

        let outcome = if hit.is_some() { "hit" } else { "miss" };
        CACHE_LOOKUPS.with_label_values(&[self.name, outcome]).inc();
        hit
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.store.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Returns the cached value or computes, stores and returns a fresh one.
    /// Concurrent misses may compute more than once; the last write wins.
    pub async fn get_or_insert_with<F, Fut>(&self, key: &str, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = compute().await;
        self.insert(key, value.clone());
        value
    }

    /// Fallible variant of [`Self::get_or_insert_with`]; errors are not cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = compute().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &str) {
        if self.store.remove(key).is_some() {
            debug!(cache = self.name, key, "cache entry invalidated");
        }
    }

    pub fn invalidate_prefix(&self, prefix: &str) {
        let before = self.store.len();
        self.store.retain(|key, _| !key.starts_with(prefix));
        debug!(
            cache = self.name,
            prefix,
            removed = before.saturating_sub(self.store.len()),
            "cache prefix invalidated"
        );
    }

    /// Drops expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.store.retain(|_, entry| !entry.is_expired(now));
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn computes_once_within_ttl() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_insert_with("dashboard:global", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    42
                })
                .await;
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_recomputed() {
        let cache = TtlCache::new("test", Duration::from_millis(10));
        cache.insert("k", 1);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(cache.get("k"), None);
        let value = cache.get_or_insert_with("k", || async { 2 }).await;
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new("test", Duration::from_secs(60));
        let first: Result<u32, &str> = cache.get_or_try_insert_with("k", || async { Err("down") }).await;
        assert!(first.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_prefix_only_touches_matching_keys() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.insert("projects:user:1", 1);
        cache.insert("projects:user:2", 2);
        cache.insert("dashboard:global", 3);

        cache.invalidate_prefix("projects:");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("dashboard:global"), Some(3));

        cache.invalidate("dashboard:global");
        assert!(cache.is_empty());
    }
}
