//! # TTL Cache
//!
//! A small process-wide key-value cache with per-entry expiry, shared by the
//! source adapters and the aggregator. Reads and writes go through a mutex so
//! the cache stays correct under the multi-threaded Tokio runtime.
//!
//! Expired entries are dropped lazily on lookup; `purge_expired` exists for
//! callers that want to bound memory between lookups.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub keys: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct TtlCache<V> {
    default_ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, V)>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a key, dropping it if expired. Counts a hit or a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        match guard.get(key) {
            Some((expires_at, value)) if Instant::now() < *expires_at => {
                let v = value.clone();
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(v)
            }
            Some(_) => {
                guard.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Like [`get`](Self::get) but without touching the hit/miss counters,
    /// for internal rechecks that are not a caller-visible lookup.
    pub fn peek(&self, key: &str) -> Option<V> {
        let guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        match guard.get(key) {
            Some((expires_at, value)) if Instant::now() < *expires_at => Some(value.clone()),
            _ => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        guard.insert(key.into(), (Instant::now() + ttl, value));
    }

    pub fn remove(&self, key: &str) {
        let mut guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        guard.remove(key);
    }

    pub fn clear(&self) {
        let mut guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        guard.clear();
    }

    /// Drop all expired entries eagerly.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let mut guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        guard.retain(|_, (expires_at, _)| now < *expires_at);
    }

    pub fn stats(&self) -> CacheStats {
        let keys = {
            let guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
            guard.len()
        };
        CacheStats {
            keys,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_within_ttl() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 7);
        assert_eq!(cache.get("a"), Some(7));
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_millis(0));
        cache.insert("a", 7);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn remove_and_clear_drop_entries() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.remove("a");
        assert_eq!(cache.get("a"), None);
        cache.clear();
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        let _ = cache.get("a");
        let _ = cache.get("nope");
        let s = cache.stats();
        assert_eq!(s.keys, 1);
        assert_eq!(s.hits, 1);
        assert_eq!(s.misses, 1);
    }

    #[test]
    fn peek_does_not_touch_counters() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        assert_eq!(cache.peek("a"), Some(1));
        assert_eq!(cache.peek("nope"), None);
        let s = cache.stats();
        assert_eq!(s.hits, 0);
        assert_eq!(s.misses, 0);
    }

    #[test]
    fn purge_drops_only_expired() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert_with_ttl("old", 1, Duration::from_millis(0));
        cache.insert("fresh", 2);
        std::thread::sleep(Duration::from_millis(5));
        cache.purge_expired();
        assert_eq!(cache.stats().keys, 1);
        assert_eq!(cache.get("fresh"), Some(2));
    }
}
