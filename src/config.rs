//! Router configuration.
//!
//! Every field has a default, so an empty YAML document is a valid configuration. Values are
//! layered: defaults ← YAML file ← `REPLY_*` environment variables.

use crate::cache::CacheConfig;
use crate::providers::{GeminiConfig, OllamaConfig};
use crate::resilience::{ClassificationPolicy, QuotaConfig, RetryConfig};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub quota: QuotaConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub classification: ClassificationPolicy,
    /// Upper bound on a single provider call.
    pub request_timeout_secs: u64,
    pub gemini: GeminiConfig,
    /// Local fallback; `None` runs without a secondary provider.
    pub ollama: Option<OllamaConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            quota: QuotaConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            classification: ClassificationPolicy::default(),
            request_timeout_secs: 30,
            gemini: GeminiConfig::default(),
            ollama: Some(OllamaConfig::default()),
        }
    }
}

impl RouterConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Self = serde_yaml::from_str(s)?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Defaults plus environment overrides, validated.
    pub fn from_env() -> Result<Self> {
        let cfg = Self::default().with_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Upper bound on a secondary call: the local model's timeout, else `request_timeout`.
    pub fn secondary_timeout(&self) -> Duration {
        self.ollama
            .as_ref()
            .map(OllamaConfig::timeout)
            .unwrap_or_else(|| self.request_timeout())
    }

    /// Apply `REPLY_*` environment variables on top of the current values.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_parse("REPLY_QUOTA_LIMIT")? {
            self.quota.limit = v;
        }
        if let Some(v) = env_parse("REPLY_QUOTA_WINDOW_SECS")? {
            self.quota.window_secs = v;
        }
        if let Some(v) = env_parse("REPLY_CACHE_TTL_SECS")? {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = env_parse::<usize>("REPLY_CACHE_MAX_ENTRIES")? {
            self.cache.max_entries = Some(v);
        }
        if let Some(v) = env_parse("REPLY_RETRY_MAX_ATTEMPTS")? {
            self.retry.max_attempts = v;
        }
        if let Some(v) = env_parse("REPLY_RETRY_BASE_DELAY_MS")? {
            self.retry.base_delay_ms = v;
        }
        if let Some(v) = env_parse("REPLY_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = env_string("REPLY_GEMINI_MODEL") {
            self.gemini.model = v;
        }
        if let Some(v) = env_string("REPLY_OLLAMA_URL") {
            self.ollama.get_or_insert_with(OllamaConfig::default).base_url = v;
        }
        if let Some(v) = env_string("REPLY_OLLAMA_MODEL") {
            self.ollama.get_or_insert_with(OllamaConfig::default).model = Some(v);
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quota.limit == 0 {
            return Err(invalid("quota.limit", "must be at least 1"));
        }
        if self.quota.window_secs == 0 {
            return Err(invalid("quota.window_secs", "must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(invalid(
                "retry.max_delay_ms",
                "must not be smaller than retry.base_delay_ms",
            ));
        }
        if self.cache.max_entries == Some(0) {
            return Err(invalid("cache.max_entries", "must be at least 1 or unset"));
        }
        if self.cache.secondary_ttl_secs > self.cache.ttl_secs {
            return Err(invalid(
                "cache.secondary_ttl_secs",
                "must not exceed cache.ttl_secs",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        if self.ollama.as_ref().is_some_and(|o| o.timeout_secs == 0) {
            return Err(invalid("ollama.timeout_secs", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &str, details: &str) -> Error {
    Error::configuration_with_context(
        format!("invalid value for {}", field),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(details)
            .with_source("router_config"),
    )
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            Error::configuration_with_context(
                format!("cannot parse environment variable {}", name),
                ErrorContext::new()
                    .with_field_path(name)
                    .with_details(format!("got '{}'", raw))
                    .with_source("router_config"),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderErrorKind;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = RouterConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.quota.limit, 50);
        assert_eq!(cfg.cache.ttl_secs, 3600);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.base_delay_ms, 3000);
        assert!(cfg.ollama.is_some());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(RouterConfig::from_yaml_str("").unwrap(), RouterConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
quota:
  limit: 15
cache:
  ttl_secs: 120
  secondary_ttl_secs: 60
  max_entries: null
classification:
  retryable: [rate_limited, timeout]
gemini:
  model: gemini-1.5-flash
ollama: null
"#;
        let cfg = RouterConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.quota.limit, 15);
        assert_eq!(cfg.quota.window_secs, 60);
        assert_eq!(cfg.cache.max_entries, None);
        assert_eq!(cfg.gemini.model, "gemini-1.5-flash");
        assert_eq!(cfg.gemini.max_output_tokens, 2048);
        assert!(cfg.ollama.is_none());
        assert!(!cfg.classification.is_retryable(ProviderErrorKind::Network));
        cfg.validate().unwrap();
    }

    #[test]
    fn test_validation_errors_name_the_field() {
        let mut cfg = RouterConfig::default();
        cfg.cache.secondary_ttl_secs = cfg.cache.ttl_secs + 1;
        let err = cfg.validate().unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("cache.secondary_ttl_secs")
        );

        let mut cfg = RouterConfig::default();
        cfg.quota.limit = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_secondary_timeout_defaults() {
        let mut cfg = RouterConfig::default();
        assert_eq!(cfg.secondary_timeout(), Duration::from_secs(120));
        cfg.ollama = None;
        assert_eq!(cfg.secondary_timeout(), cfg.request_timeout());
    }

    #[test]
    fn test_bad_yaml_is_an_error() {
        assert!(matches!(
            RouterConfig::from_yaml_str("quota: [1, 2"),
            Err(Error::Yaml(_))
        ));
    }
}
