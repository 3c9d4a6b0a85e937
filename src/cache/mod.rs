//! Result cache (C3): time-bounded, size-bounded mapping from a fingerprint
//! to a prior extraction result, with LRU eviction.
//!
//! Built on the `lru` crate (already a teacher dependency), which gives us
//! O(1) promote-on-access and evict-oldest for free; this module layers a
//! per-entry TTL on top since `lru::LruCache` alone is not time-aware.

use std::time::{Duration, Instant};

use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Time- and size-bounded cache with approximate LRU eviction.
///
/// Every operation takes an async lock, matching spec §5's statement that
/// cache reads and writes are serialised within a worker.
pub struct ResultCache<V> {
    inner: Mutex<LruCache<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    #[must_use]
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(max_size.max(1)).expect("max(1) is never zero");
        Self {
            inner: Mutex::new(LruCache::new(cap)),
            ttl,
        }
    }

    /// Returns the value if present and not expired, promoting it to
    /// most-recently-used. Expired entries are evicted on access.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.inner.lock().await;
        let expired = match guard.get(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            guard.pop(key);
            return None;
        }
        guard.get(key).map(|entry| entry.value.clone())
    }

    /// `has(key)` is `get(key) != absent` and therefore also promotes.
    pub async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    /// Removes any existing entry for `key`, evicts the single
    /// least-recently-used entry if at capacity, then inserts as
    /// most-recently-used with a fresh timestamp.
    pub async fn set(&self, key: String, value: V) {
        let mut guard = self.inner.lock().await;
        guard.pop(&key);
        guard.put(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    pub async fn size(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn bounds_size_to_max() {
        let cache = ResultCache::new(2, Duration::from_secs(60));
        cache.set("a".into(), 1).await;
        cache.set("b".into(), 2).await;
        cache.set("c".into(), 3).await;
        assert!(cache.size().await <= 2);
    }

    #[tokio::test]
    async fn lru_eviction_order() {
        let cache = ResultCache::new(2, Duration::from_secs(60));
        cache.set("a".into(), 1).await;
        cache.set("b".into(), 2).await;
        cache.set("c".into(), 3).await;

        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(2));
        assert_eq!(cache.get("c").await, Some(3));
    }

    #[tokio::test]
    async fn get_between_sets_protects_from_eviction() {
        let cache = ResultCache::new(2, Duration::from_secs(60));
        cache.set("a".into(), 1).await;
        cache.set("b".into(), 2).await;
        // Touch "a" so it becomes most-recently-used.
        assert_eq!(cache.get("a").await, Some(1));
        cache.set("c".into(), 3).await;

        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.get("c").await, Some(3));
    }

    #[tokio::test]
    async fn ttl_expiry_makes_entries_observationally_absent() {
        let cache = ResultCache::new(10, Duration::from_millis(20));
        cache.set("a".into(), 1).await;
        assert_eq!(cache.get("a").await, Some(1));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("a").await, None);
        assert!(!cache.has("a").await);
    }

    #[tokio::test]
    async fn set_overwrites_existing_key() {
        let cache = ResultCache::new(10, Duration::from_secs(60));
        cache.set("a".into(), 1).await;
        cache.set("a".into(), 2).await;
        assert_eq!(cache.get("a").await, Some(2));
        assert_eq!(cache.size().await, 1);
    }

    #[tokio::test]
    async fn clear_empties_cache() {
        let cache = ResultCache::new(10, Duration::from_secs(60));
        cache.set("a".into(), 1).await;
        cache.clear().await;
        assert_eq!(cache.size().await, 0);
        assert_eq!(cache.get("a").await, None);
    }
}
