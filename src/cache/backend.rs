//! Cache backend implementations.

use super::key::Fingerprint;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A stored result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub result: Vec<String>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    fn new(fingerprint: Fingerprint, result: Vec<String>, ttl: Duration) -> Self {
        Self {
            fingerprint,
            result,
            created_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Storage behind the [`CacheManager`](super::CacheManager).
///
/// Implementations guard their state with a single lock and never hold it across an await.
pub trait CacheBackend: Send + Sync {
    /// Unexpired entry for `key`; an expired hit is evicted.
    fn get(&self, key: &Fingerprint) -> Option<CacheEntry>;
    /// Insert or overwrite, resetting the entry's age.
    fn put(&self, key: Fingerprint, result: Vec<String>, ttl: Duration);
    fn remove(&self, key: &Fingerprint) -> bool;
    fn clear(&self);
    /// Number of unexpired entries.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Entries dropped so far because they expired or the cap was hit.
    fn evictions(&self) -> u64 {
        0
    }
    fn name(&self) -> &'static str;
}

/// In-memory cache with optional entry cap; when full, the oldest-created entry goes first.
pub struct MemoryCache {
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
    max_entries: Option<usize>,
    evicted: AtomicU64,
}

impl MemoryCache {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries,
            evicted: AtomicU64::new(0),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict_if_needed(&self, entries: &mut HashMap<Fingerprint, CacheEntry>, max: usize) {
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, e| !e.is_expired_at(now));
        while !entries.is_empty() && entries.len() >= max {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }
        let dropped = before - entries.len();
        if dropped > 0 {
            self.evicted.fetch_add(dropped as u64, Ordering::Relaxed);
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &Fingerprint) -> Option<CacheEntry> {
        let mut entries = self.lock();
        let expired = entries.get(key)?.is_expired();
        if expired {
            entries.remove(key);
            self.evicted.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        entries.get(key).cloned()
    }

    fn put(&self, key: Fingerprint, result: Vec<String>, ttl: Duration) {
        let mut entries = self.lock();
        if let Some(max) = self.max_entries {
            if !entries.contains_key(&key) {
                self.evict_if_needed(&mut entries, max);
            }
        }
        entries.insert(key.clone(), CacheEntry::new(key, result, ttl));
    }

    fn remove(&self, key: &Fingerprint) -> bool {
        self.lock().remove(key).is_some()
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| !e.is_expired_at(now)).count()
    }

    fn evictions(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// No-op cache used when caching is disabled.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for NullCache {
    fn get(&self, _: &Fingerprint) -> Option<CacheEntry> {
        None
    }
    fn put(&self, _: Fingerprint, _: Vec<String>, _: Duration) {}
    fn remove(&self, _: &Fingerprint) -> bool {
        false
    }
    fn clear(&self) {}
    fn len(&self) -> usize {
        0
    }
    fn name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint;
    use crate::types::ReplyRequest;

    fn fp(text: &str) -> Fingerprint {
        fingerprint(&ReplyRequest::builder().text(text).build().unwrap())
    }

    #[test]
    fn test_put_then_get() {
        let cache = MemoryCache::unbounded();
        cache.put(fp("a"), vec!["one".into(), "two".into()], Duration::from_secs(60));
        let entry = cache.get(&fp("a")).expect("hit");
        assert_eq!(entry.result, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(entry.fingerprint, fp("a"));
        assert!(cache.get(&fp("b")).is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted_on_lookup() {
        let cache = MemoryCache::unbounded();
        cache.put(fp("a"), vec!["x".into()], Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&fp("a")).is_none());
        assert_eq!(cache.evictions(), 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_put_overwrites_and_resets_age() {
        let cache = MemoryCache::unbounded();
        cache.put(fp("a"), vec!["old".into()], Duration::from_millis(60));
        std::thread::sleep(Duration::from_millis(40));
        cache.put(fp("a"), vec!["new".into()], Duration::from_millis(60));
        std::thread::sleep(Duration::from_millis(40));
        let entry = cache.get(&fp("a")).expect("refreshed entry should survive");
        assert_eq!(entry.result, vec!["new".to_string()]);
    }

    #[test]
    fn test_cap_evicts_oldest_created() {
        let cache = MemoryCache::new(Some(2));
        cache.put(fp("a"), vec!["a".into()], Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(2));
        cache.put(fp("b"), vec!["b".into()], Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(2));
        // Reading "a" must not save it: eviction is by creation time, not access.
        assert!(cache.get(&fp("a")).is_some());
        cache.put(fp("c"), vec!["c".into()], Duration::from_secs(60));
        assert!(cache.get(&fp("a")).is_none());
        assert!(cache.get(&fp("b")).is_some());
        assert!(cache.get(&fp("c")).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let cache = MemoryCache::unbounded();
        cache.put(fp("a"), vec!["a".into()], Duration::from_secs(60));
        cache.clear();
        assert!(cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_null_cache_stores_nothing() {
        let cache = NullCache::new();
        cache.put(fp("a"), vec!["a".into()], Duration::from_secs(60));
        assert!(cache.get(&fp("a")).is_none());
        assert_eq!(cache.name(), "null");
    }
}
