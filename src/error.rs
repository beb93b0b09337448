use crate::providers::{ProviderError, ProviderErrorKind};
use crate::transport::TransportError;
use crate::types::ProviderKind;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for configuration and validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error
    /// (e.g., "quota.limit", "request.suggestion_count")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config_loader", "request_builder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// What the caller should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// Quota pressure or a transient upstream problem; waiting helps.
    TryAgainLater,
    /// The request itself was rejected (safety block, malformed input).
    FixInput,
    /// Credentials, local fallback or configuration are broken.
    Misconfigured,
}

/// Unified error type for the reply orchestration layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Retryable {provider} provider error: {source}")]
    RetryableProvider {
        provider: ProviderKind,
        #[source]
        source: ProviderError,
    },

    #[error("Terminal {provider} provider error: {source}")]
    TerminalProvider {
        provider: ProviderKind,
        #[source]
        source: ProviderError,
    },

    #[error("{provider} provider failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        provider: ProviderKind,
        attempts: u32,
        last: ProviderError,
    },

    #[error("Primary quota exhausted ({limit} calls per window){}", format_retry_in(.retry_in))]
    QuotaExhausted {
        limit: u32,
        retry_in: Option<Duration>,
    },

    #[error("Secondary provider unavailable: {0}")]
    SecondaryUnavailable(ProviderError),

    #[error("All providers failed (primary: {primary}; secondary: {secondary})")]
    AllProvidersFailed {
        primary: Box<Error>,
        secondary: Box<Error>,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_retry_in(retry_in: &Option<Duration>) -> String {
    match retry_in {
        Some(d) => format!(", capacity returns in {}s", d.as_secs().max(1)),
        None => String::new(),
    }
}

impl Error {
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// The underlying provider error, when this failure came from a provider call.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Error::RetryableProvider { source, .. } | Error::TerminalProvider { source, .. } => {
                Some(source)
            }
            Error::RetriesExhausted { last, .. } => Some(last),
            Error::SecondaryUnavailable(e) => Some(e),
            _ => None,
        }
    }

    /// Classify this failure for the caller.
    ///
    /// For `AllProvidersFailed` a fix-your-input cause on either side wins; otherwise the
    /// primary cause decides, so a quota-starved primary still reads as "try again later"
    /// even when the local fallback is missing.
    pub fn category(&self) -> FailureCategory {
        match self {
            Error::RetryableProvider { .. }
            | Error::RetriesExhausted { .. }
            | Error::QuotaExhausted { .. }
            | Error::Transport(_) => FailureCategory::TryAgainLater,
            Error::TerminalProvider { source, .. } => source.kind.category(),
            Error::SecondaryUnavailable(_)
            | Error::Configuration { .. }
            | Error::Io(_)
            | Error::Yaml(_)
            | Error::Serialization(_) => FailureCategory::Misconfigured,
            Error::Validation { .. } => FailureCategory::FixInput,
            Error::AllProvidersFailed { primary, secondary } => {
                let p = primary.category();
                if p == FailureCategory::FixInput
                    || secondary.category() == FailureCategory::FixInput
                {
                    FailureCategory::FixInput
                } else {
                    p
                }
            }
        }
    }

    /// Map a provider failure into the crate taxonomy given its retryability.
    pub(crate) fn from_provider(
        provider: ProviderKind,
        source: ProviderError,
        retryable: bool,
    ) -> Self {
        if provider == ProviderKind::Secondary && source.kind == ProviderErrorKind::Unavailable {
            return Error::SecondaryUnavailable(source);
        }
        if retryable {
            Error::RetryableProvider { provider, source }
        } else {
            Error::TerminalProvider { provider, source }
        }
    }
}
