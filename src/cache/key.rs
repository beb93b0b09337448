//! Request fingerprinting.

use crate::types::ReplyRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Bumped whenever normalization changes so old keys never alias new ones.
const FINGERPRINT_VERSION: &str = "1";

/// Deterministic cache key for a [`ReplyRequest`] (hex SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derives fingerprints from requests.
///
/// Free-text fields are trimmed, lower-cased and whitespace-collapsed before hashing, so
/// "Hey,  you up?" and "hey, you up?" share a cache slot. The screenshot contributes its
/// digest only. Fields go through a sorted map, so the canonical form does not depend on
/// declaration or insertion order.
#[derive(Debug, Clone, Default)]
pub struct Fingerprinter {
    salt: Option<String>,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self { salt: None }
    }

    /// Mix a deployment-specific salt into every key (e.g. the model name).
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn fingerprint(&self, request: &ReplyRequest) -> Fingerprint {
        let mut parts: BTreeMap<&str, String> = BTreeMap::new();
        parts.insert("version", FINGERPRINT_VERSION.to_string());
        parts.insert("text", normalize_text(request.source_text()));
        parts.insert("mood", request.mood().id().to_string());
        parts.insert("length", request.length().id().to_string());
        parts.insert("count", request.suggestion_count().to_string());
        if let Some(digest) = request.image_digest() {
            parts.insert("image", digest.to_hex());
        }
        if let Some(ctx) = request.extra_context() {
            parts.insert("context", normalize_text(ctx));
        }
        if let Some(ref s) = self.salt {
            parts.insert("salt", s.clone());
        }
        let canonical = serde_json::to_string(&parts).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Fingerprint(hash)
    }
}

/// Fingerprint with the default (unsalted) fingerprinter.
pub fn fingerprint(request: &ReplyRequest) -> Fingerprint {
    Fingerprinter::new().fingerprint(request)
}

fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageAttachment, Mood, ReplyLength};

    fn base() -> crate::types::ReplyRequestBuilder {
        ReplyRequest::builder()
            .text("hey, you up?")
            .mood(Mood::Flirty)
            .length(ReplyLength::Short)
            .suggestion_count(3)
    }

    #[test]
    fn test_equal_requests_share_fingerprint() {
        let a = base().build().unwrap();
        let b = base().build().unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).as_str().len(), 64);
    }

    #[test]
    fn test_formatting_differences_are_normalized() {
        let a = base().build().unwrap();
        let b = base().text("  Hey,\n you   UP? ").build().unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_every_field_changes_fingerprint() {
        let reference = fingerprint(&base().build().unwrap());
        let variants = vec![
            base().text("hey, you awake?").build().unwrap(),
            base().mood(Mood::Romantic).build().unwrap(),
            base().length(ReplyLength::Long).build().unwrap(),
            base().suggestion_count(4).build().unwrap(),
            base().extra_context("my boss").build().unwrap(),
            base()
                .image(ImageAttachment::from_bytes(vec![1, 2, 3]))
                .build()
                .unwrap(),
        ];
        for v in &variants {
            assert_ne!(fingerprint(v), reference, "variant {:?} collided", v);
        }
    }

    #[test]
    fn test_image_digest_not_bytes_identity() {
        let a = base()
            .image(ImageAttachment::from_bytes(vec![9, 9, 9]))
            .build()
            .unwrap();
        let b = base()
            .image(ImageAttachment::from_bytes(vec![9, 9, 9]).with_mime_type("image/jpeg"))
            .build()
            .unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_salt_separates_deployments() {
        let req = base().build().unwrap();
        let salted = Fingerprinter::new().with_salt("gemini-2.0-flash-exp");
        assert_ne!(salted.fingerprint(&req), fingerprint(&req));
    }
}
