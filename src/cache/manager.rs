//! Cache manager.

use super::backend::{CacheBackend, CacheEntry, MemoryCache, NullCache};
use super::key::Fingerprint;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Lifetime of results from the primary provider.
    pub ttl_secs: u64,
    /// Lifetime of results from the local fallback; never longer than `ttl_secs`.
    pub secondary_ttl_secs: u64,
    /// Entry cap; `None` leaves the cache unbounded.
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            secondary_ttl_secs: 600,
            max_entries: Some(1000),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    /// TTLs are kept in whole seconds; a fractional part rounds up.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = whole_secs(ttl);
        self
    }
    /// Rounded up to whole seconds like [`CacheConfig::with_ttl`].
    pub fn with_secondary_ttl(mut self, ttl: Duration) -> Self {
        self.secondary_ttl_secs = whole_secs(ttl);
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
    pub fn with_max_entries(mut self, max: Option<usize>) -> Self {
        self.max_entries = max;
        self
    }
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
    pub fn secondary_ttl(&self) -> Duration {
        Duration::from_secs(self.secondary_ttl_secs.min(self.ttl_secs))
    }
}

fn whole_secs(d: Duration) -> u64 {
    d.as_secs().saturating_add(u64::from(d.subsec_nanos() > 0))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
}

/// Response cache: fingerprint → suggestions, with TTL expiry and manual flush.
pub struct CacheManager {
    config: CacheConfig,
    backend: Box<dyn CacheBackend>,
    stats: AtomicStats,
}

impl CacheManager {
    pub fn new(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            stats: AtomicStats::default(),
        }
    }

    /// Memory backend when enabled, null backend otherwise.
    pub fn from_config(config: CacheConfig) -> Self {
        let backend: Box<dyn CacheBackend> = if config.enabled {
            Box::new(MemoryCache::new(config.max_entries))
        } else {
            Box::new(NullCache::new())
        };
        Self::new(config, backend)
    }

    pub fn get(&self, key: &Fingerprint) -> Option<CacheEntry> {
        match self.backend.get(key) {
            Some(entry) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: Fingerprint, result: Vec<String>, ttl: Duration) {
        self.backend.put(key, result, ttl);
        self.stats.puts.fetch_add(1, Ordering::Relaxed);
    }

    /// Store with the primary TTL.
    pub fn put_default(&self, key: Fingerprint, result: Vec<String>) {
        self.put(key, result, self.config.ttl())
    }

    pub fn remove(&self, key: &Fingerprint) -> bool {
        self.backend.remove(key)
    }

    pub fn clear(&self) {
        self.backend.clear();
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            puts: self.stats.puts.load(Ordering::Relaxed),
            evictions: self.backend.evictions(),
            entries: self.backend.len(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint;
    use crate::types::ReplyRequest;

    fn fp() -> Fingerprint {
        fingerprint(&ReplyRequest::builder().text("hello").build().unwrap())
    }

    #[test]
    fn test_sub_second_ttl_rounds_up() {
        let cfg = CacheConfig::default()
            .with_ttl(Duration::from_millis(500))
            .with_secondary_ttl(Duration::from_millis(1500));
        assert_eq!(cfg.ttl(), Duration::from_secs(1));
        assert_eq!(cfg.secondary_ttl_secs, 2);
        assert_eq!(cfg.secondary_ttl(), Duration::from_secs(1));

        let cfg = CacheConfig::default().with_ttl(Duration::ZERO);
        assert_eq!(cfg.ttl(), Duration::ZERO);
        let cfg = CacheConfig::default().with_ttl(Duration::from_secs(90));
        assert_eq!(cfg.ttl_secs, 90);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = CacheManager::from_config(CacheConfig::default());
        assert!(cache.get(&fp()).is_none());
        cache.put_default(fp(), vec!["hi".into()]);
        assert!(cache.get(&fp()).is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_disabled_cache_uses_null_backend() {
        let cache = CacheManager::from_config(CacheConfig::default().with_enabled(false));
        cache.put_default(fp(), vec!["hi".into()]);
        assert!(cache.get(&fp()).is_none());
        assert_eq!(cache.backend_name(), "null");
    }

    #[test]
    fn test_secondary_ttl_never_exceeds_primary() {
        let cfg = CacheConfig::default()
            .with_ttl(Duration::from_secs(60))
            .with_secondary_ttl(Duration::from_secs(600));
        assert_eq!(cfg.secondary_ttl(), Duration::from_secs(60));
    }
}
