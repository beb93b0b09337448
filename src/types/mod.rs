//! # Types Module
//!
//! Core request and result types shared by every stage of the router.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ReplyRequest`] | Immutable request: conversation, screenshot, mood, length, count |
//! | [`Mood`] | One of the ten reply tones |
//! | [`ReplyLength`] | Short, medium or long replies |
//! | [`ImageAttachment`] | Screenshot bytes plus their SHA-256 digest |
//! | [`ProviderResult`] | Ordered suggestions and where they came from |
//!
//! ## Example
//!
//! ```rust
//! use ai_reply_rust::types::{Mood, ReplyLength, ReplyRequest};
//!
//! let request = ReplyRequest::builder()
//!     .text("hey, you up?")
//!     .mood(Mood::Flirty)
//!     .length(ReplyLength::Short)
//!     .suggestion_count(3)
//!     .build()
//!     .unwrap();
//! assert_eq!(request.suggestion_count(), 3);
//! ```

pub mod image;
pub mod request;
pub mod result;

pub use image::{ImageAttachment, ImageDigest};
pub use request::{
    Mood, ReplyLength, ReplyRequest, ReplyRequestBuilder, MAX_SUGGESTIONS, MIN_SUGGESTIONS,
};
pub use result::{ProviderKind, ProviderResult, ResultSource};
