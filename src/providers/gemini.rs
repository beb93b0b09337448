//! Google Gemini generateContent provider (primary).
//!
//! - Request body uses `contents[].parts[]`; a screenshot goes in as an `inline_data` part.
//! - `generationConfig` carries temperature, topP and maxOutputTokens.
//! - The API key travels in the `x-goog-api-key` header.
//! - Response text lives in `candidates[0].content.parts[*].text`; a prompt-level block is
//!   reported in `promptFeedback.blockReason`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{
    truncate_message, GenerationPrompt, GenerationProvider, ProviderError, ProviderErrorKind,
};
use crate::credential::ApiKey;
use crate::transport::{retry_after, HttpTransport};
use crate::types::ProviderKind;
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            temperature: 0.7,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug)]
pub struct GeminiProvider {
    transport: HttpTransport,
    config: GeminiConfig,
    api_key: ApiKey,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, api_key: ApiKey, timeout: Duration) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "Gemini model name is empty",
                ErrorContext::new()
                    .with_field_path("gemini.model")
                    .with_source("gemini_provider"),
            ));
        }
        let transport = HttpTransport::new(&config.base_url, timeout)?;
        Ok(Self {
            transport,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("/v1beta/models/{}:generateContent", self.config.model)
    }

    fn build_body(&self, prompt: &GenerationPrompt) -> Value {
        let mut parts = vec![serde_json::json!({ "text": prompt.text })];
        if let Some(image) = &prompt.image {
            parts.push(serde_json::json!({
                "inline_data": {
                    "mime_type": image.mime_type(),
                    "data": image.to_base64(),
                }
            }));
        }
        serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "topP": self.config.top_p,
                "maxOutputTokens": self.config.max_output_tokens,
            }
        })
    }

    fn parse_response(body: &Value) -> std::result::Result<String, ProviderError> {
        if let Some(reason) = body
            .pointer("/promptFeedback/blockReason")
            .and_then(|v| v.as_str())
        {
            return Err(ProviderError::new(
                ProviderErrorKind::SafetyBlocked,
                format!("prompt blocked: {}", reason),
            ));
        }

        let text: String = body
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if !text.trim().is_empty() {
            return Ok(text);
        }

        let finish_reason = body
            .pointer("/candidates/0/finishReason")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        match finish_reason {
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => Err(
                ProviderError::new(
                    ProviderErrorKind::SafetyBlocked,
                    format!("response blocked: {}", finish_reason),
                ),
            ),
            _ => Err(ProviderError::new(
                ProviderErrorKind::Unknown,
                "response was empty",
            )),
        }
    }

    fn error_from_status(status: u16, headers: &HeaderMap, body: &str) -> ProviderError {
        let json: Option<Value> = serde_json::from_str(body).ok();
        let message = json
            .as_ref()
            .and_then(|j| j.pointer("/error/message"))
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| truncate_message(body, 200));
        let lowered = body.to_lowercase();

        let kind = match status {
            429 => {
                return ProviderError::rate_limited(message, retry_after(headers));
            }
            401 | 403 => ProviderErrorKind::InvalidCredential,
            400 if lowered.contains("api_key_invalid") || lowered.contains("api key") => {
                ProviderErrorKind::InvalidCredential
            }
            408 => ProviderErrorKind::Timeout,
            400..=499 => ProviderErrorKind::InvalidRequest,
            500..=599 => ProviderErrorKind::Network,
            _ => ProviderErrorKind::Unknown,
        };
        ProviderError::new(kind, format!("HTTP {}: {}", status, message))
    }
}

pub(crate) fn map_send_error(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::new(ProviderErrorKind::Timeout, e.to_string())
    } else {
        ProviderError::new(ProviderErrorKind::Network, e.to_string())
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Primary
    }

    fn name(&self) -> String {
        self.config.model.clone()
    }

    async fn generate(
        &self,
        prompt: &GenerationPrompt,
    ) -> std::result::Result<String, ProviderError> {
        let body = self.build_body(prompt);
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(self.api_key.expose()).map_err(|_| {
            ProviderError::new(
                ProviderErrorKind::InvalidCredential,
                "API key contains characters not allowed in a header",
            )
        })?;
        headers.insert("x-goog-api-key", key);

        let resp = self
            .transport
            .post_json(&self.endpoint(), &body, headers)
            .await
            .map_err(|e| map_send_error(&e))?;

        let status = resp.status().as_u16();
        let resp_headers = resp.headers().clone();
        let text = resp.text().await.map_err(|e| map_send_error(&e))?;
        debug!(
            http_status = status,
            model = self.config.model.as_str(),
            "gemini response received"
        );

        if !(200..300).contains(&status) {
            return Err(Self::error_from_status(status, &resp_headers, &text));
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::Unknown,
                format!("malformed response body: {}", e),
            )
        })?;
        Self::parse_response(&json)
    }
}
