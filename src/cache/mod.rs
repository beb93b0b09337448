//! # Response Caching Module
//!
//! Fingerprint-keyed cache of generated suggestions. Identical requests inside the TTL are
//! answered without touching any provider, which also spares the primary quota.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Fingerprinter`] | Stable request key (normalized text, mood, length, count, image digest) |
//! | [`CacheManager`] | TTL handling, hit/miss statistics, manual flush |
//! | [`CacheBackend`] | Storage trait |
//! | [`MemoryCache`] | Mutex-guarded map with an optional oldest-first entry cap |
//! | [`NullCache`] | No-op backend for disabled caching |
//!
//! Expired entries are evicted lazily on lookup; there is no background sweep.
//!
//! ```rust
//! use ai_reply_rust::cache::{fingerprint, CacheConfig, CacheManager};
//! use ai_reply_rust::types::ReplyRequest;
//!
//! let cache = CacheManager::from_config(CacheConfig::default());
//! let request = ReplyRequest::builder().text("hey, you up?").build().unwrap();
//! let key = fingerprint(&request);
//! cache.put_default(key.clone(), vec!["Always, for you.".to_string()]);
//! assert!(cache.get(&key).is_some());
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, CacheEntry, MemoryCache, NullCache};
pub use key::{fingerprint, Fingerprint, Fingerprinter};
pub use manager::{CacheConfig, CacheManager, CacheStats};
