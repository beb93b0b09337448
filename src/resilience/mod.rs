//! # Resilience Primitives Module
//!
//! Quota tracking and retry control for the primary provider.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`quota`] | Trailing-window call counter with remaining capacity and health |
//! | [`retry`] | Bounded retry loop with exponential backoff |
//! | [`classify`] | Pluggable retryable/terminal classification of provider errors |
//!
//! ## Quota Tracker
//!
//! A fixed trailing window rather than a token bucket: the failure that matters is the
//! provider's hard per-minute quota, and user-paced traffic is bursty.
//!
//! ```rust
//! use ai_reply_rust::resilience::quota::{QuotaHealth, QuotaTracker};
//! use std::time::Duration;
//!
//! let tracker = QuotaTracker::new(50, Duration::from_secs(60));
//! tracker.record_attempt();
//! assert_eq!(tracker.remaining_capacity(), 49);
//! assert_eq!(tracker.health(), QuotaHealth::Healthy);
//! ```
//!
//! ## Retry Controller
//!
//! ```rust
//! use ai_reply_rust::resilience::retry::{RetryConfig, RetryController};
//! use ai_reply_rust::types::ProviderKind;
//!
//! # async fn demo() -> ai_reply_rust::Result<()> {
//! let retry = RetryController::new(RetryConfig::default());
//! let text = retry
//!     .call(ProviderKind::Primary, |_attempt| async { Ok("**Reply 1:** hi".to_string()) })
//!     .await?;
//! # Ok(()) }
//! ```

pub mod classify;
pub mod quota;
pub mod retry;

pub use classify::{ClassificationPolicy, ErrorClassifier, ErrorDisposition};
pub use quota::{QuotaConfig, QuotaHealth, QuotaSnapshot, QuotaTracker};
pub use retry::{Attempt, AttemptOutcome, RetryConfig, RetryController};
