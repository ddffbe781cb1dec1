//! Thread-safe key/value cache with per-entry expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Interval between two background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Expiry used when `now + ttl` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheItem<V> {
    value: V,
    expiry: Instant,
}

impl<V> CacheItem<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expiry
    }
}

/// A cache whose entries expire after a caller-chosen time-to-live.
///
/// Cloning the cache yields another handle to the same map. Values are
/// returned by clone, so store `Arc`s (or other cheap handles) in `V`.
#[derive(Debug)]
pub struct TtlCache<V> {
    items: Arc<Mutex<HashMap<String, CacheItem<V>>>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    /// Create an empty cache. No sweeper runs until [`TtlCache::spawn_sweeper`].
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheItem<V>>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` under `key` until `ttl` has elapsed, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let expiry = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        self.lock().insert(key.into(), CacheItem { value, expiry });
    }

    /// Return the live value for `key`. An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut items = self.lock();
        let expired = items.get(key)?.is_expired(Instant::now());
        if expired {
            items.remove(key);
            return None;
        }
        items.get(key).map(|item| item.value.clone())
    }

    /// Remove and return the value for `key`.
    ///
    /// An expired entry is still removed, but the call reports a miss.
    pub fn pop(&self, key: &str) -> Option<V> {
        let item = self.lock().remove(key)?;
        if item.is_expired(Instant::now()) {
            return None;
        }
        Some(item.value)
    }

    /// Remove `key` if present.
    pub fn del(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut items = self.lock();
        let before = items.len();
        items.retain(|_, item| !item.is_expired(now));
        before - items.len()
    }

    /// Run [`TtlCache::sweep_expired`] every `interval` until `shutdown` fires.
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.sweep_expired();
                        if removed > 0 {
                            tracing::debug!(
                                removed,
                                remaining = cache.len(),
                                "Swept expired cache entries"
                            );
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Cache sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_set_then_get() {
        let cache = TtlCache::new();
        cache.set("k", 42u32, Duration::from_secs(5));
        assert_eq!(cache.get("k"), Some(42));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let cache = TtlCache::new();
        cache.set("k", 1u8, Duration::from_secs(u64::MAX));
        cache.set("m", 2u8, Duration::MAX);
        assert_eq!(cache.get("k"), Some(1));
        assert_eq!(cache.get("m"), Some(2));
        assert_eq!(cache.sweep_expired(), 0);
    }

    #[test]
    fn test_set_overwrites() {
        let cache = TtlCache::new();
        cache.set("k", "first", Duration::from_secs(5));
        cache.set("k", "second", Duration::from_secs(5));
        assert_eq!(cache.get("k"), Some("second"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_expired_evicts() {
        let cache = TtlCache::new();
        cache.set("k", 1u8, Duration::from_millis(10));
        sleep(Duration::from_millis(30));

        // Untouched expired entries still count.
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_pop_is_exactly_once() {
        let cache = TtlCache::new();
        cache.set("k", String::from("v"), Duration::from_secs(5));
        assert_eq!(cache.pop("k").as_deref(), Some("v"));
        assert_eq!(cache.pop("k"), None);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_pop_expired_removes_and_misses() {
        let cache = TtlCache::new();
        cache.set("k", 7i64, Duration::from_millis(10));
        sleep(Duration::from_millis(30));
        assert_eq!(cache.pop("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_del_and_clear() {
        let cache = TtlCache::new();
        cache.del("missing");
        cache.set("a", 1, Duration::from_secs(5));
        cache.set("b", 2, Duration::from_secs(5));
        cache.del("a");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let cache = TtlCache::new();
        cache.set("short", 1, Duration::from_millis(10));
        cache.set("long", 2, Duration::from_secs(60));
        sleep(Duration::from_millis(30));

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = TtlCache::new();
        let other = cache.clone();
        cache.set("k", Arc::new(vec![1, 2, 3]), Duration::from_secs(5));
        let value = other.get("k").unwrap();
        assert_eq!(*value, vec![1, 2, 3]);
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = TtlCache::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.set(format!("{t}-{i}"), i, Duration::from_secs(5));
                        assert_eq!(cache.get(&format!("{t}-{i}")), Some(i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }

    #[tokio::test]
    async fn test_sweeper_evicts_and_stops_on_shutdown() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::from_millis(10));

        let (tx, rx) = broadcast::channel(1);
        let handle = cache.spawn_sweeper(Duration::from_millis(20), rx);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.len(), 0);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should exit after shutdown")
            .unwrap();
    }
}
