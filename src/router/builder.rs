use super::ProviderRouter;
use crate::cache::{CacheBackend, CacheManager, Fingerprinter};
use crate::config::RouterConfig;
use crate::credential::ApiKey;
use crate::prompt::PromptBuilder;
use crate::providers::{GeminiProvider, GenerationProvider, OllamaProvider};
use crate::resilience::{ErrorClassifier, QuotaTracker, RetryController};
use crate::types::ProviderKind;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Builder for [`ProviderRouter`].
///
/// Only the primary provider is required. Everything else falls back to
/// [`RouterConfig::default`] and the in-memory cache.
pub struct ProviderRouterBuilder {
    primary: Option<Arc<dyn GenerationProvider>>,
    secondary: Option<Arc<dyn GenerationProvider>>,
    config: RouterConfig,
    classifier: Option<Arc<dyn ErrorClassifier>>,
    cache_backend: Option<Box<dyn CacheBackend>>,
    fingerprint_salt: Option<String>,
    max_inflight: Option<usize>,
}

impl Default for ProviderRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRouterBuilder {
    pub fn new() -> Self {
        Self {
            primary: None,
            secondary: None,
            config: RouterConfig::default(),
            classifier: None,
            cache_backend: None,
            fingerprint_salt: None,
            max_inflight: None,
        }
    }

    pub fn primary(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.primary = Some(provider);
        self
    }

    pub fn secondary(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.secondary = Some(provider);
        self
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the configured retryable-kind policy with a custom classifier.
    pub fn classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn cache_backend(mut self, backend: Box<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Namespace cache keys, e.g. per user.
    pub fn fingerprint_salt(mut self, salt: impl Into<String>) -> Self {
        self.fingerprint_salt = Some(salt.into());
        self
    }

    /// Limit the number of requests routed at once.
    ///
    /// Also settable via `REPLY_MAX_INFLIGHT`.
    pub fn max_inflight(mut self, n: usize) -> Self {
        self.max_inflight = Some(n.max(1));
        self
    }

    /// Build a router with the Gemini primary and, when configured, the Ollama secondary.
    pub fn from_config(config: RouterConfig, api_key: ApiKey) -> Result<Self> {
        let primary =
            GeminiProvider::new(config.gemini.clone(), api_key, config.request_timeout())?;
        let mut builder = Self::new().primary(Arc::new(primary));
        if let Some(ollama) = config.ollama.clone() {
            builder = builder.secondary(Arc::new(OllamaProvider::new(ollama)?));
        }
        Ok(builder.config(config))
    }

    pub fn build(self) -> Result<ProviderRouter> {
        self.config.validate()?;

        let primary = self.primary.ok_or_else(|| {
            Error::configuration_with_context(
                "a primary provider is required",
                ErrorContext::new()
                    .with_field_path("primary")
                    .with_source("provider_router_builder"),
            )
        })?;
        check_role(primary.as_ref(), ProviderKind::Primary)?;
        if let Some(secondary) = &self.secondary {
            check_role(secondary.as_ref(), ProviderKind::Secondary)?;
        }

        let classifier = self.classifier.unwrap_or_else(|| {
            Arc::new(self.config.classification.clone()) as Arc<dyn ErrorClassifier>
        });
        let cache = match self.cache_backend {
            Some(backend) => CacheManager::new(self.config.cache.clone(), backend),
            None => CacheManager::from_config(self.config.cache.clone()),
        };
        let fingerprinter = match self.fingerprint_salt {
            Some(salt) => Fingerprinter::new().with_salt(salt),
            None => Fingerprinter::new(),
        };

        let max_inflight = self.max_inflight.or_else(|| {
            std::env::var("REPLY_MAX_INFLIGHT")
                .ok()?
                .parse::<usize>()
                .ok()
                .map(|n| n.max(1))
        });

        debug!(
            primary = primary.name().as_str(),
            secondary = self.secondary.as_ref().map(|s| s.name()).as_deref(),
            cache_backend = cache.backend_name(),
            quota_limit = self.config.quota.limit,
            max_attempts = self.config.retry.max_attempts,
            "provider router built"
        );

        Ok(ProviderRouter {
            primary,
            secondary: self.secondary,
            fingerprinter,
            prompts: PromptBuilder::new(),
            cache,
            quota: QuotaTracker::from_config(&self.config.quota),
            retry: RetryController::with_classifier(self.config.retry.clone(), classifier.clone()),
            classifier,
            request_timeout: self.config.request_timeout(),
            secondary_timeout: self.config.secondary_timeout(),
            inflight: max_inflight.map(|n| Arc::new(Semaphore::new(n))),
            max_inflight: max_inflight.unwrap_or(0),
        })
    }
}

fn check_role(provider: &dyn GenerationProvider, expected: ProviderKind) -> Result<()> {
    if provider.kind() == expected {
        return Ok(());
    }
    Err(Error::configuration_with_context(
        format!("provider '{}' cannot act as the {} provider", provider.name(), expected),
        ErrorContext::new()
            .with_field_path(expected.to_string())
            .with_details(format!("provider reports role {}", provider.kind()))
            .with_source("provider_router_builder"),
    ))
}
