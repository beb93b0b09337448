//! Generation providers: the remote primary and the local fallback behind one trait.
//!
//! The router only depends on [`GenerationProvider`]; which concrete backend fills each role
//! is decided at construction time.

pub mod gemini;
pub mod ollama;

use crate::error::FailureCategory;
use crate::types::{ImageAttachment, ProviderKind, ReplyLength};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub use gemini::{GeminiConfig, GeminiProvider};
pub use ollama::{OllamaConfig, OllamaProvider};

/// Provider-side failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Quota or rate limit hit (HTTP 429, RESOURCE_EXHAUSTED).
    RateLimited,
    /// Prompt or answer rejected by content safety filters.
    SafetyBlocked,
    /// Missing, malformed or revoked API key.
    InvalidCredential,
    /// The provider rejected the request itself.
    InvalidRequest,
    /// Connection reset, DNS failure, 5xx.
    Network,
    /// No answer within the configured timeout.
    Timeout,
    /// Backend not reachable or has no usable model (local fallback).
    Unavailable,
    /// Anything else, including empty answers.
    Unknown,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::SafetyBlocked => "safety_blocked",
            ProviderErrorKind::InvalidCredential => "invalid_credential",
            ProviderErrorKind::InvalidRequest => "invalid_request",
            ProviderErrorKind::Network => "network",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Unavailable => "unavailable",
            ProviderErrorKind::Unknown => "unknown",
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            ProviderErrorKind::SafetyBlocked | ProviderErrorKind::InvalidRequest => {
                FailureCategory::FixInput
            }
            ProviderErrorKind::InvalidCredential | ProviderErrorKind::Unavailable => {
                FailureCategory::Misconfigured
            }
            ProviderErrorKind::RateLimited
            | ProviderErrorKind::Network
            | ProviderErrorKind::Timeout
            | ProviderErrorKind::Unknown => FailureCategory::TryAgainLater,
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    /// Server-suggested wait before the next attempt.
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            message: message.into(),
            retry_after,
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ProviderErrorKind::Timeout,
            format!("no response within {}s", after.as_secs_f32()),
        )
    }
}

/// Per-call generation hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    pub max_suggestions: u8,
    pub length_hint: ReplyLength,
}

/// Everything a provider needs for one call.
#[derive(Debug, Clone)]
pub struct GenerationPrompt {
    pub text: String,
    pub image: Option<ImageAttachment>,
    pub options: GenerateOptions,
}

/// A backend that turns a prompt into raw reply text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Role this provider plays in the router.
    fn kind(&self) -> ProviderKind;

    /// Human-readable backend name, e.g. `"gemini-2.0-flash-exp"` or `"ollama (llama3)"`.
    fn name(&self) -> String;

    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, ProviderError>;
}

/// Trim an upstream body for inclusion in an error message.
pub(crate) fn truncate_message(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}…", cut)
    }
}
