//! # Provider Router
//!
//! Entry point for reply generation. A request walks a fixed sequence of states:
//!
//! ```text
//! CHECK_CACHE ─hit──────────────────────────────────────────────▶ respond (cache)
//!      │miss
//! CHECK_QUOTA ─exhausted─────────────────┐
//!      │capacity                          ▼
//! CALL_PRIMARY ─failed──────────▶ CALL_SECONDARY ─failed─▶ respond (AllProvidersFailed)
//!      │ok                                │ok
//!      ▼                                  ▼
//! write-through (primary TTL)      write-through (secondary TTL)
//! ```
//!
//! The primary call goes through the [`RetryController`]; every underlying attempt is
//! recorded in the [`QuotaTracker`]. The secondary is called once. Every provider call is
//! bounded by the configured request timeout.

mod builder;
mod signals;

pub use builder::ProviderRouterBuilder;
pub use signals::{InflightSnapshot, RouterSignals};

use crate::cache::{CacheManager, Fingerprint, Fingerprinter};
use crate::prompt::{parse_suggestions, PromptBuilder};
use crate::providers::{GenerationPrompt, GenerationProvider, ProviderError, ProviderErrorKind};
use crate::resilience::{ErrorClassifier, ErrorDisposition, QuotaTracker, RetryController};
use crate::types::{ProviderKind, ProviderResult, ReplyRequest};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Where a request currently is in the routing sequence.
enum State {
    CheckCache,
    CheckQuota,
    CallPrimary,
    /// Carries the reason the primary did not answer.
    CallSecondary(Error),
}

pub struct ProviderRouter {
    primary: Arc<dyn GenerationProvider>,
    secondary: Option<Arc<dyn GenerationProvider>>,
    fingerprinter: Fingerprinter,
    prompts: PromptBuilder,
    cache: CacheManager,
    quota: QuotaTracker,
    retry: RetryController,
    classifier: Arc<dyn ErrorClassifier>,
    request_timeout: Duration,
    secondary_timeout: Duration,
    inflight: Option<Arc<Semaphore>>,
    max_inflight: usize,
}

impl ProviderRouter {
    pub fn builder() -> ProviderRouterBuilder {
        ProviderRouterBuilder::new()
    }

    /// Produce suggestions for `request`.
    ///
    /// Fails only when both providers fail (or the primary is skipped and the secondary
    /// fails); the error then carries both causes.
    pub async fn handle(&self, request: &ReplyRequest) -> Result<ProviderResult> {
        let key = self.fingerprinter.fingerprint(request);
        let span = info_span!(
            "reply",
            request_id = %Uuid::new_v4(),
            fingerprint = key.short(),
        );
        async {
            let _permit = match &self.inflight {
                Some(sem) => Some(sem.clone().acquire_owned().await.map_err(|_| {
                    Error::configuration_with_context(
                        "request limiter closed",
                        crate::ErrorContext::new().with_source("provider_router"),
                    )
                })?),
                None => None,
            };
            self.route(request, &key).await
        }
        .instrument(span)
        .await
    }

    async fn route(&self, request: &ReplyRequest, key: &Fingerprint) -> Result<ProviderResult> {
        let max = usize::from(request.suggestion_count());
        let mut prompt: Option<GenerationPrompt> = None;
        let mut state = State::CheckCache;

        loop {
            state = match state {
                State::CheckCache => match self.cache.get(key) {
                    Some(entry) => {
                        debug!(age_ms = entry.age().as_millis() as u64, "cache hit");
                        return Ok(ProviderResult::from_cache(entry.result));
                    }
                    None => {
                        debug!("cache miss");
                        State::CheckQuota
                    }
                },
                State::CheckQuota => {
                    // Reserves the first primary attempt; retries record their own.
                    if self.quota.try_record() {
                        let snapshot = self.quota.snapshot();
                        debug!(
                            remaining = snapshot.remaining,
                            health = %snapshot.health,
                            "quota reserved"
                        );
                        State::CallPrimary
                    } else {
                        let snapshot = self.quota.snapshot();
                        info!(
                            limit = snapshot.limit,
                            retry_in_ms = snapshot.retry_in.map(|d| d.as_millis() as u64),
                            "primary quota exhausted, skipping to secondary"
                        );
                        State::CallSecondary(Error::QuotaExhausted {
                            limit: snapshot.limit,
                            retry_in: snapshot.retry_in,
                        })
                    }
                }
                State::CallPrimary => {
                    let prompt = prompt.get_or_insert_with(|| self.prompts.build(request));
                    match self.call_primary(prompt).await {
                        Ok(raw) => {
                            let text = parse_suggestions(&raw, max);
                            self.cache.put(key.clone(), text.clone(), self.cache.config().ttl());
                            info!(
                                provider = self.primary.name().as_str(),
                                suggestions = text.len(),
                                "primary provider answered"
                            );
                            return Ok(ProviderResult::from_provider(ProviderKind::Primary, text));
                        }
                        Err(e) => {
                            info!(error = %e, "primary provider failed, falling back");
                            State::CallSecondary(e)
                        }
                    }
                }
                State::CallSecondary(primary_err) => {
                    let prompt = prompt.get_or_insert_with(|| self.prompts.build(request));
                    match self.call_secondary(prompt).await {
                        Ok(raw) => {
                            let text = parse_suggestions(&raw, max);
                            self.cache.put(
                                key.clone(),
                                text.clone(),
                                self.cache.config().secondary_ttl(),
                            );
                            info!(
                                suggestions = text.len(),
                                primary_error = %primary_err,
                                "secondary provider answered"
                            );
                            return Ok(ProviderResult::from_provider(
                                ProviderKind::Secondary,
                                text,
                            ));
                        }
                        Err(secondary_err) => {
                            warn!(
                                primary_error = %primary_err,
                                secondary_error = %secondary_err,
                                "all providers failed"
                            );
                            return Err(Error::AllProvidersFailed {
                                primary: Box::new(primary_err),
                                secondary: Box::new(secondary_err),
                            });
                        }
                    }
                }
            };
        }
    }

    async fn call_primary(&self, prompt: &GenerationPrompt) -> Result<String> {
        let (result, trace) = self
            .retry
            .call_traced(ProviderKind::Primary, move |attempt| async move {
                if attempt > 1 {
                    self.quota.record_attempt();
                }
                bounded(
                    self.primary.as_ref(),
                    prompt,
                    self.request_timeout,
                    ProviderErrorKind::Unknown,
                )
                .await
            })
            .await;
        debug!(attempts = trace.len(), "primary call finished");
        result
    }

    async fn call_secondary(&self, prompt: &GenerationPrompt) -> Result<String> {
        let secondary = self.secondary.as_ref().ok_or_else(|| {
            Error::SecondaryUnavailable(ProviderError::new(
                ProviderErrorKind::Unavailable,
                "no local fallback configured",
            ))
        })?;
        bounded(
            secondary.as_ref(),
            prompt,
            self.secondary_timeout,
            ProviderErrorKind::InvalidRequest,
        )
        .await
        .map_err(|e| {
            let retryable = self.classifier.classify(&e) == ErrorDisposition::Retryable;
            Error::from_provider(ProviderKind::Secondary, e, retryable)
        })
    }

    /// Point-in-time view of quota, cache and concurrency state.
    pub fn signals(&self) -> RouterSignals {
        RouterSignals {
            quota: self.quota.snapshot(),
            cache: self.cache.stats(),
            primary: self.primary.name(),
            secondary: self.secondary.as_ref().map(|s| s.name()),
            inflight: self.inflight.as_ref().map(|sem| {
                let available = sem.available_permits();
                InflightSnapshot {
                    max: self.max_inflight,
                    available,
                    in_use: self.max_inflight.saturating_sub(available),
                }
            }),
        }
    }

    pub fn secondary_configured(&self) -> bool {
        self.secondary.is_some()
    }

    /// Drop every cached answer. Quota history is kept.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("response cache cleared");
    }

    /// Drop cached answers and quota history.
    pub fn reset_session(&self) {
        self.cache.clear();
        self.quota.reset();
        info!("session reset");
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Deadline for a secondary call; the local model's own timeout when configured.
    pub fn secondary_timeout(&self) -> Duration {
        self.secondary_timeout
    }
}

/// One provider call under a deadline. A blank answer becomes an `empty_kind` error.
async fn bounded(
    provider: &dyn GenerationProvider,
    prompt: &GenerationPrompt,
    deadline: Duration,
    empty_kind: ProviderErrorKind,
) -> std::result::Result<String, ProviderError> {
    match tokio::time::timeout(deadline, provider.generate(prompt)).await {
        Err(_) => Err(ProviderError::timeout(deadline)),
        Ok(Ok(text)) if text.trim().is_empty() => Err(ProviderError::new(
            empty_kind,
            format!("{} returned an empty response", provider.kind()),
        )),
        Ok(result) => result,
    }
}
