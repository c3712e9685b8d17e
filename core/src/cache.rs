//! Time-bounded memo of fetched results, keyed by the canonical filter string.
//!
//! A zero TTL disables the cache: `put` is a no-op and `get` always misses.
//! Entries are never served past their expiry, and every `put` sweeps the
//! expired ones, so the map only holds keys used within the last TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value:      V,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct ResultCache<V: Clone> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl:     Duration,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl == Duration::ZERO
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if self.is_disabled() {
            return None;
        }
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|e| Instant::now() < e.expires_at)
            .map(|e| e.value.clone())
    }

    pub fn put(&self, key: String, value: V) {
        if self.is_disabled() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            let now = Instant::now();
            entries.retain(|_, e| e.expires_at > now);
            entries.insert(key, CacheEntry { value, expires_at: now + self.ttl });
        }
    }

    /// Return the cached value for `key`, or run `load` and remember its
    /// result. Errors are never cached.
    pub fn get_or_try_insert<E>(
        &self,
        key: &str,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(hit) = self.get(key) {
            log::debug!("cache: hit {key}");
            return Ok(hit);
        }
        let value = load()?;
        self.put(key.to_string(), value.clone());
        Ok(value)
    }

    pub fn clear_expired(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            let now = Instant::now();
            entries.retain(|_, e| e.expires_at > now);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Number of entries, including any expired since the last sweep.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_never_stores() {
        let cache: ResultCache<u32> = ResultCache::disabled();
        cache.put("k".into(), 7);
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn hit_within_ttl() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.put("k".into(), 7u32);
        assert_eq!(cache.get("k"), Some(7));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn expired_entry_is_not_served() {
        let cache = ResultCache::new(Duration::from_millis(10));
        cache.put("k".into(), 7u32);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), None);
        cache.clear_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn inserts_sweep_expired_entries() {
        let cache = ResultCache::new(Duration::from_millis(5));
        for i in 0..20u32 {
            cache.put(format!("k{i}"), i);
            std::thread::sleep(Duration::from_millis(6));
        }
        assert_eq!(cache.len(), 1, "only the newest key may survive");

        let value: Result<u32, &str> = cache.get_or_try_insert("fresh", || Ok(99));
        assert_eq!(value, Ok(99));
        assert_eq!(cache.len(), 1, "a miss that loads also sweeps");
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let first: Result<u32, &str> = cache.get_or_try_insert("k", || Err("down"));
        assert!(first.is_err());
        let second: Result<u32, &str> = cache.get_or_try_insert("k", || Ok(3));
        assert_eq!(second, Ok(3));
        let third: Result<u32, &str> = cache.get_or_try_insert("k", || Ok(99));
        assert_eq!(third, Ok(3), "second load must be served from cache");
    }
}
