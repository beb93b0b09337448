use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Primary calls allowed per window.
    pub limit: u32,
    /// Length of the trailing window in seconds.
    pub window_secs: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit: 50,
            window_secs: 60,
        }
    }
}

impl QuotaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_window_secs(mut self, secs: u64) -> Self {
        self.window_secs = secs;
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Coarse classification of remaining primary capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaHealth {
    /// At least half the window's budget is left.
    Healthy,
    /// Between 10% and 50% left.
    Warning,
    /// Under 10% left, or nothing at all.
    Critical,
}

impl fmt::Display for QuotaHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaHealth::Healthy => f.write_str("healthy"),
            QuotaHealth::Warning => f.write_str("warning"),
            QuotaHealth::Critical => f.write_str("critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    pub health: QuotaHealth,
    pub window: Duration,
    /// Time until the oldest recorded call leaves the window, if capacity is currently zero.
    pub retry_in: Option<Duration>,
}

/// Trailing-window counter of calls made to the primary provider.
///
/// - The window is pruned on every query, never on a timer
/// - Successful and failed calls count alike
pub struct QuotaTracker {
    limit: u32,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl QuotaTracker {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_config(cfg: &QuotaConfig) -> Self {
        Self::new(cfg.limit, cfg.window())
    }

    fn lock_pruned(&self, now: Instant) -> MutexGuard<'_, VecDeque<Instant>> {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(&oldest) = calls.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }
        calls
    }

    pub fn record_attempt(&self) {
        let now = Instant::now();
        self.lock_pruned(now).push_back(now);
    }

    /// Record an attempt only if capacity remains. Check and record happen under one lock.
    pub fn try_record(&self) -> bool {
        let now = Instant::now();
        let mut calls = self.lock_pruned(now);
        if calls.len() >= self.limit as usize {
            return false;
        }
        calls.push_back(now);
        true
    }

    pub fn remaining_capacity(&self) -> u32 {
        let used = self.lock_pruned(Instant::now()).len();
        self.limit.saturating_sub(used as u32)
    }

    pub fn health(&self) -> QuotaHealth {
        classify(self.remaining_capacity(), self.limit)
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        let now = Instant::now();
        let calls = self.lock_pruned(now);
        let used = calls.len() as u32;
        let remaining = self.limit.saturating_sub(used);
        let retry_in = if remaining == 0 {
            calls
                .front()
                .map(|&oldest| self.window.saturating_sub(now.saturating_duration_since(oldest)))
        } else {
            None
        };
        QuotaSnapshot {
            limit: self.limit,
            used,
            remaining,
            health: classify(remaining, self.limit),
            window: self.window,
            retry_in,
        }
    }

    /// Forget every recorded call.
    pub fn reset(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

fn classify(remaining: u32, limit: u32) -> QuotaHealth {
    let remaining = u64::from(remaining) * 100;
    let limit = u64::from(limit);
    if remaining == 0 {
        QuotaHealth::Critical
    } else if remaining >= limit * 50 {
        QuotaHealth::Healthy
    } else if remaining >= limit * 10 {
        QuotaHealth::Warning
    } else {
        QuotaHealth::Critical
    }
}
