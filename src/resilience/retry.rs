//! Retry controller
//!
//! Wraps a single provider call in a bounded retry loop with exponential backoff. It never
//! switches providers; fallback is the router's decision.

use super::classify::{ClassificationPolicy, ErrorClassifier, ErrorDisposition};
use crate::providers::{ProviderError, ProviderErrorKind};
use crate::types::ProviderKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Configuration for retry logic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 3_000,
            max_delay_ms: 60_000,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    /// A provider retry-after hint replaces the computed value but is still capped.
    pub fn backoff(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let factor = 1u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let computed = self.base_delay_ms.saturating_mul(factor);
        let chosen = hint
            .map(|h| h.as_millis() as u64)
            .unwrap_or(computed)
            .min(self.max_delay_ms);
        Duration::from_millis(chosen)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Retryable(ProviderErrorKind),
    Terminal(ProviderErrorKind),
}

/// One call made by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub attempt_number: u32,
    pub delay_before: Duration,
    pub outcome: AttemptOutcome,
}

pub struct RetryController {
    config: RetryConfig,
    classifier: Arc<dyn ErrorClassifier>,
}

impl RetryController {
    pub fn new(config: RetryConfig) -> Self {
        Self::with_classifier(config, Arc::new(ClassificationPolicy::default()))
    }

    pub fn with_classifier(config: RetryConfig, classifier: Arc<dyn ErrorClassifier>) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn classify(&self, err: &ProviderError) -> ErrorDisposition {
        self.classifier.classify(err)
    }

    pub async fn call<F, Fut>(&self, provider: ProviderKind, op: F) -> Result<String>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<String, ProviderError>>,
    {
        self.call_traced(provider, op).await.0
    }

    /// Run `op` until it succeeds, fails terminally, or the attempt budget runs out.
    ///
    /// `op` receives the 1-based attempt number. The returned trace lists every attempt in
    /// order. No lock is held while sleeping; the sleep yields to the runtime.
    pub async fn call_traced<F, Fut>(
        &self,
        provider: ProviderKind,
        mut op: F,
    ) -> (Result<String>, Vec<Attempt>)
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<String, ProviderError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut trace = Vec::with_capacity(max_attempts as usize);
        let mut attempt = 0u32;
        let mut delay = Duration::ZERO;

        loop {
            attempt += 1;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let err = match op(attempt).await {
                Ok(text) => {
                    trace.push(Attempt {
                        attempt_number: attempt,
                        delay_before: delay,
                        outcome: AttemptOutcome::Success,
                    });
                    return (Ok(text), trace);
                }
                Err(err) => err,
            };

            match self.classifier.classify(&err) {
                ErrorDisposition::Terminal => {
                    trace.push(Attempt {
                        attempt_number: attempt,
                        delay_before: delay,
                        outcome: AttemptOutcome::Terminal(err.kind),
                    });
                    warn!(
                        provider = %provider,
                        attempt,
                        error_kind = %err.kind,
                        "terminal provider error, not retrying"
                    );
                    return (
                        Err(Error::TerminalProvider {
                            provider,
                            source: err,
                        }),
                        trace,
                    );
                }
                ErrorDisposition::Retryable => {
                    trace.push(Attempt {
                        attempt_number: attempt,
                        delay_before: delay,
                        outcome: AttemptOutcome::Retryable(err.kind),
                    });
                    if attempt >= max_attempts {
                        warn!(
                            provider = %provider,
                            attempts = attempt,
                            error_kind = %err.kind,
                            "retries exhausted"
                        );
                        return (
                            Err(Error::RetriesExhausted {
                                provider,
                                attempts: attempt,
                                last: err,
                            }),
                            trace,
                        );
                    }
                    delay = self.config.backoff(attempt, err.retry_after);
                    warn!(
                        provider = %provider,
                        attempt,
                        error_kind = %err.kind,
                        backoff_ms = delay.as_millis() as u64,
                        "retryable provider error, backing off"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig::new()
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.backoff(1, None), Duration::from_secs(3));
        assert_eq!(cfg.backoff(2, None), Duration::from_secs(6));
        assert_eq!(cfg.backoff(3, None), Duration::from_secs(12));
        assert_eq!(cfg.backoff(10, None), Duration::from_secs(60));
        assert_eq!(cfg.backoff(200, None), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_prefers_hint_but_caps_it() {
        let cfg = RetryConfig::default();
        assert_eq!(
            cfg.backoff(1, Some(Duration::from_secs(10))),
            Duration::from_secs(10)
        );
        assert_eq!(
            cfg.backoff(1, Some(Duration::from_secs(600))),
            Duration::from_secs(60)
        );
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let ctl = RetryController::new(fast());
        let (res, trace) = ctl
            .call_traced(ProviderKind::Primary, |_| async { Ok("ok".to_string()) })
            .await;
        assert_eq!(res.unwrap(), "ok");
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].delay_before, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let ctl = RetryController::new(fast());
        let (res, trace) = ctl
            .call_traced(ProviderKind::Primary, |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ProviderError::new(ProviderErrorKind::Network, "reset"))
                    } else {
                        Ok("second time lucky".to_string())
                    }
                }
            })
            .await;
        assert_eq!(res.unwrap(), "second time lucky");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(trace[1].delay_before, Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_retryable_exhausts_budget() {
        let calls = AtomicU32::new(0);
        let ctl = RetryController::new(fast().with_max_attempts(3));
        let res = ctl
            .call(ProviderKind::Primary, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::rate_limited("429", None)) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match res {
            Err(Error::RetriesExhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last.kind, ProviderErrorKind::RateLimited);
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_terminal_fails_once() {
        let calls = AtomicU32::new(0);
        let ctl = RetryController::new(fast().with_max_attempts(5));
        let res = ctl
            .call(ProviderKind::Primary, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ProviderError::new(
                        ProviderErrorKind::InvalidCredential,
                        "API key not valid",
                    ))
                }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(res, Err(Error::TerminalProvider { .. })));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let calls = AtomicU32::new(0);
        let ctl = RetryController::new(fast().with_max_attempts(0));
        let _ = ctl
            .call(ProviderKind::Primary, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::new(ProviderErrorKind::Timeout, "slow")) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_classifier() {
        struct NothingRetries;
        impl ErrorClassifier for NothingRetries {
            fn classify(&self, _: &ProviderError) -> ErrorDisposition {
                ErrorDisposition::Terminal
            }
        }
        let calls = AtomicU32::new(0);
        let ctl = RetryController::with_classifier(fast(), Arc::new(NothingRetries));
        let res = ctl
            .call(ProviderKind::Primary, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::rate_limited("429", None)) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(res, Err(Error::TerminalProvider { .. })));
    }
}
