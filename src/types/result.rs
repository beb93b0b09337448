use serde::{Deserialize, Serialize};
use std::fmt;

/// The two generation backends the router knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Remote model, preferred while quota allows.
    Primary,
    /// Local model, used when the primary is skipped or fails.
    Secondary,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Primary => f.write_str("primary"),
            ProviderKind::Secondary => f.write_str("secondary"),
        }
    }
}

/// Where a result came from. A result is either a cache hit or a fresh provider answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "provider")]
pub enum ResultSource {
    Cache,
    Provider(ProviderKind),
}

/// Suggestions returned to the caller.
///
/// Serializes as `{"text": [...], "source": "provider", "provider": "primary"}`, or
/// `{"text": [...], "source": "cache"}` for cache hits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResult {
    text: Vec<String>,
    #[serde(flatten)]
    source: ResultSource,
}

impl ProviderResult {
    pub fn from_provider(provider: ProviderKind, text: Vec<String>) -> Self {
        Self {
            text,
            source: ResultSource::Provider(provider),
        }
    }

    pub fn from_cache(text: Vec<String>) -> Self {
        Self {
            text,
            source: ResultSource::Cache,
        }
    }

    /// Ordered reply suggestions.
    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn into_text(self) -> Vec<String> {
        self.text
    }

    pub fn source(&self) -> ResultSource {
        self.source
    }

    pub fn served_from_cache(&self) -> bool {
        matches!(self.source, ResultSource::Cache)
    }

    /// The provider that generated this answer; `None` for cache hits.
    pub fn provider_used(&self) -> Option<ProviderKind> {
        match self.source {
            ResultSource::Provider(p) => Some(p),
            ResultSource::Cache => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_is_exclusive() {
        let fresh = ProviderResult::from_provider(ProviderKind::Primary, vec!["hi".into()]);
        assert!(!fresh.served_from_cache());
        assert_eq!(fresh.provider_used(), Some(ProviderKind::Primary));

        let cached = ProviderResult::from_cache(vec!["hi".into()]);
        assert!(cached.served_from_cache());
        assert_eq!(cached.provider_used(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let r = ProviderResult::from_provider(ProviderKind::Secondary, vec!["a".into()]);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["source"], "provider");
        assert_eq!(v["provider"], "secondary");
        assert_eq!(v["text"][0], "a");
        let back: ProviderResult = serde_json::from_value(v).unwrap();
        assert_eq!(back, r);

        let cached = serde_json::to_value(ProviderResult::from_cache(vec!["b".into()])).unwrap();
        assert_eq!(cached, serde_json::json!({ "text": ["b"], "source": "cache" }));
    }
}
