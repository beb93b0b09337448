//! # ai-reply-rust
//!
//! Resilient orchestration for AI reply suggestions.
//!
//! ## Overview
//!
//! Given a conversation (text and/or a screenshot) plus a mood, a reply length and a
//! suggestion count, the router returns ordered reply suggestions while protecting a
//! quota-limited remote model:
//!
//! - identical requests are answered from a fingerprint-keyed cache
//! - calls to the remote model are counted in a trailing window and skipped at the limit
//! - transient remote failures are retried with exponential backoff
//! - a local model answers when the remote one is skipped or fails
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_reply_rust::{
//!     ApiKey, Mood, ProviderRouterBuilder, ReplyLength, ReplyRequest, RouterConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> ai_reply_rust::Result<()> {
//!     let config = RouterConfig::from_env()?;
//!     let key = ApiKey::resolve(None, "gemini")?;
//!     let router = ProviderRouterBuilder::from_config(config, key)?.build()?;
//!
//!     let request = ReplyRequest::builder()
//!         .text("hey, you up?")
//!         .mood(Mood::Flirty)
//!         .length(ReplyLength::Short)
//!         .suggestion_count(3)
//!         .build()?;
//!
//!     let result = router.handle(&request).await?;
//!     for reply in result.text() {
//!         println!("{}", reply);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`router`] | Cache → quota → primary (with retry) → secondary state machine |
//! | [`cache`] | Request fingerprints and the TTL response cache |
//! | [`resilience`] | Quota tracker, retry controller, error classification |
//! | [`providers`] | Provider trait plus the Gemini and Ollama backends |
//! | [`prompt`] | Prompt rendering and suggestion parsing |
//! | [`types`] | Requests, moods, lengths, images, results |
//! | [`config`] | YAML/env configuration |
//! | [`credential`] | API key resolution |
//! | [`transport`] | Shared HTTP client |

pub mod cache;
pub mod config;
pub mod credential;
pub mod prompt;
pub mod providers;
pub mod resilience;
pub mod router;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use config::RouterConfig;
pub use credential::ApiKey;
pub use providers::{GenerationPrompt, GenerationProvider, ProviderError, ProviderErrorKind};
pub use router::{ProviderRouter, ProviderRouterBuilder, RouterSignals};
pub use types::{
    ImageAttachment, Mood, ProviderKind, ProviderResult, ReplyLength, ReplyRequest, ResultSource,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, FailureCategory};
