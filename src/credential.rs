//! In-memory API credential for the remote provider.

use crate::{Error, ErrorContext, Result};
use keyring::Entry;
use std::env;
use std::fmt;

/// Keyring service name used when looking up a stored key.
pub const KEYRING_SERVICE: &str = "ai-reply";

/// Environment variable consulted last.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Caller-supplied API key. Lives only in memory and never prints itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(Error::configuration_with_context(
                "API key is empty",
                ErrorContext::new()
                    .with_field_path("credential")
                    .with_source("credential"),
            ));
        }
        Ok(Self(key))
    }

    /// Explicit value, then the OS keyring (`ai-reply` / `provider`), then `GEMINI_API_KEY`.
    pub fn resolve(explicit: Option<&str>, provider: &str) -> Result<Self> {
        if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
            return Self::new(key);
        }

        if let Ok(entry) = Entry::new(KEYRING_SERVICE, provider) {
            if let Ok(key) = entry.get_password() {
                if !key.trim().is_empty() {
                    return Self::new(key);
                }
            }
        }

        match env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Self::new(key),
            _ => Err(Error::configuration_with_context(
                "no API key configured for the primary provider",
                ErrorContext::new()
                    .with_field_path("credential")
                    .with_details(format!(
                        "pass one explicitly, store it in the '{}' keyring service, or set {}",
                        KEYRING_SERVICE, API_KEY_ENV
                    ))
                    .with_source("credential"),
            )),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
