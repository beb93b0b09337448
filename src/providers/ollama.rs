//! Local Ollama provider (secondary).
//!
//! Installed models come from `GET /api/tags`; generation is a non-streaming
//! `POST /api/generate`. Failures here are almost always configuration problems (daemon not
//! running, no models pulled), so they surface as `Unavailable` and are never retried.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info};

use super::{
    truncate_message, GenerationPrompt, GenerationProvider, ProviderError, ProviderErrorKind,
};
use crate::transport::HttpTransport;
use crate::types::ProviderKind;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    /// Model to use; the first installed model when unset.
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: None,
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug)]
pub struct OllamaProvider {
    transport: HttpTransport,
    configured_model: Option<String>,
    discovered_model: RwLock<Option<String>>,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.base_url, config.timeout())?;
        Ok(Self {
            transport,
            configured_model: config.model.filter(|m| !m.trim().is_empty()),
            discovered_model: RwLock::new(None),
        })
    }

    /// Names of locally installed models.
    pub async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let resp = self
            .transport
            .get("/api/tags")
            .await
            .map_err(|e| unavailable(&e))?;
        if !resp.status().is_success() {
            return Err(ProviderError::new(
                ProviderErrorKind::Unavailable,
                format!("model listing failed with HTTP {}", resp.status().as_u16()),
            ));
        }
        let body: Value = resp.json().await.map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::Unavailable,
                format!("unreadable model listing: {}", e),
            )
        })?;
        Ok(body
            .get("models")
            .and_then(|m| m.as_array())
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// True when the daemon answers and at least one model is installed.
    pub async fn is_available(&self) -> bool {
        matches!(self.list_models().await, Ok(models) if !models.is_empty())
    }

    async fn resolve_model(&self) -> std::result::Result<String, ProviderError> {
        if let Some(model) = &self.configured_model {
            return Ok(model.clone());
        }
        if let Some(model) = self
            .discovered_model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Ok(model);
        }

        let models = self.list_models().await?;
        let model = models.into_iter().next().ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::Unavailable,
                "no local models installed (try `ollama pull <model>`)",
            )
        })?;
        info!(model = model.as_str(), "discovered local fallback model");
        *self
            .discovered_model
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(model.clone());
        Ok(model)
    }
}

fn unavailable(e: &reqwest::Error) -> ProviderError {
    let message = if e.is_connect() {
        "cannot connect to Ollama; make sure it is running (ollama serve)".to_string()
    } else if e.is_timeout() {
        format!("Ollama did not answer in time: {}", e)
    } else {
        format!("Ollama error: {}", e)
    };
    ProviderError::new(ProviderErrorKind::Unavailable, message)
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Secondary
    }

    fn name(&self) -> String {
        let model = self.configured_model.clone().or_else(|| {
            self.discovered_model
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        });
        match model {
            Some(m) => format!("ollama ({})", m),
            None => "ollama".to_string(),
        }
    }

    async fn generate(
        &self,
        prompt: &GenerationPrompt,
    ) -> std::result::Result<String, ProviderError> {
        let model = self.resolve_model().await?;
        let mut body = serde_json::json!({
            "model": model,
            "prompt": prompt.text,
            "stream": false,
        });
        if let Some(image) = &prompt.image {
            body["images"] = serde_json::json!([image.to_base64()]);
        }

        let resp = self
            .transport
            .post_json("/api/generate", &body, HeaderMap::new())
            .await
            .map_err(|e| unavailable(&e))?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| unavailable(&e))?;
        debug!(http_status = status, model = model.as_str(), "ollama response received");

        if status == 404 {
            return Err(ProviderError::new(
                ProviderErrorKind::Unavailable,
                format!("model '{}' is not installed", model),
            ));
        }
        if !(200..300).contains(&status) {
            return Err(ProviderError::new(
                ProviderErrorKind::InvalidRequest,
                format!("HTTP {}: {}", status, truncate_message(&text, 200)),
            ));
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::InvalidRequest,
                format!("malformed response body: {}", e),
            )
        })?;
        match json.get("response").and_then(|r| r.as_str()) {
            Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
            _ => Err(ProviderError::new(
                ProviderErrorKind::InvalidRequest,
                "local model returned an empty response",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_model_means_discovery() {
        let provider = OllamaProvider::new(OllamaConfig {
            model: Some("  ".into()),
            ..OllamaConfig::default()
        })
        .unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.kind(), ProviderKind::Secondary);
    }

    #[test]
    fn test_configured_model_in_name() {
        let provider = OllamaProvider::new(OllamaConfig {
            model: Some("llama3.2".into()),
            ..OllamaConfig::default()
        })
        .unwrap();
        assert_eq!(provider.name(), "ollama (llama3.2)");
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_unavailable() {
        // Port 9 (discard) is essentially never serving HTTP locally.
        let provider = OllamaProvider::new(OllamaConfig {
            base_url: "http://127.0.0.1:9".into(),
            model: None,
            timeout_secs: 2,
        })
        .unwrap();
        let err = provider.list_models().await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Unavailable);
        assert!(!provider.is_available().await);
    }
}
