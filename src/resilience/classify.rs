//! Retryable vs terminal classification of provider errors.

use crate::providers::{ProviderError, ProviderErrorKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Worth waiting and calling again.
    Retryable,
    /// Retrying cannot help; stop and let the router decide on fallback.
    Terminal,
}

/// Decides whether a provider error is worth retrying.
///
/// Provider error taxonomies differ, so this is a seam rather than a fixed table. The default
/// implementation is [`ClassificationPolicy`].
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, err: &ProviderError) -> ErrorDisposition;
}

/// Kind-based classifier whose retryable set comes from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationPolicy {
    pub retryable: Vec<ProviderErrorKind>,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self {
            retryable: vec![
                ProviderErrorKind::RateLimited,
                ProviderErrorKind::Network,
                ProviderErrorKind::Timeout,
                ProviderErrorKind::Unknown,
            ],
        }
    }
}

impl ClassificationPolicy {
    pub fn new(retryable: Vec<ProviderErrorKind>) -> Self {
        Self { retryable }
    }

    pub fn is_retryable(&self, kind: ProviderErrorKind) -> bool {
        self.retryable.contains(&kind)
    }
}

impl ErrorClassifier for ClassificationPolicy {
    fn classify(&self, err: &ProviderError) -> ErrorDisposition {
        if self.is_retryable(err.kind) {
            ErrorDisposition::Retryable
        } else {
            ErrorDisposition::Terminal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retryable_kinds() {
        let policy = ClassificationPolicy::default();
        for kind in [
            ProviderErrorKind::RateLimited,
            ProviderErrorKind::Network,
            ProviderErrorKind::Timeout,
            ProviderErrorKind::Unknown,
        ] {
            assert_eq!(
                policy.classify(&ProviderError::new(kind, "x")),
                ErrorDisposition::Retryable,
                "{kind} should be retryable"
            );
        }
    }

    #[test]
    fn test_default_terminal_kinds() {
        let policy = ClassificationPolicy::default();
        for kind in [
            ProviderErrorKind::SafetyBlocked,
            ProviderErrorKind::InvalidCredential,
            ProviderErrorKind::InvalidRequest,
            ProviderErrorKind::Unavailable,
        ] {
            assert_eq!(
                policy.classify(&ProviderError::new(kind, "x")),
                ErrorDisposition::Terminal,
                "{kind} should be terminal"
            );
        }
    }

    #[test]
    fn test_policy_from_yaml() {
        let policy: ClassificationPolicy =
            serde_yaml::from_str("retryable: [rate_limited]").unwrap();
        assert!(policy.is_retryable(ProviderErrorKind::RateLimited));
        assert!(!policy.is_retryable(ProviderErrorKind::Network));
    }
}
