use crate::cache::CacheStats;
use crate::resilience::QuotaSnapshot;

/// A point-in-time snapshot of router state for status displays.
///
/// Facts only: callers decide what to show or how to throttle.
#[derive(Debug, Clone)]
pub struct RouterSignals {
    pub quota: QuotaSnapshot,
    pub cache: CacheStats,
    /// Name of the primary backend.
    pub primary: String,
    /// Name of the secondary backend, if one is configured.
    pub secondary: Option<String>,
    pub inflight: Option<InflightSnapshot>,
}

impl RouterSignals {
    pub fn secondary_configured(&self) -> bool {
        self.secondary.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InflightSnapshot {
    pub max: usize,
    pub available: usize,
    pub in_use: usize,
}
