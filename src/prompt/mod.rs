//! Prompt rendering and suggestion parsing.
//!
//! [`PromptBuilder`] turns a [`ReplyRequest`](crate::types::ReplyRequest) into the text sent
//! to a provider; [`parse_suggestions`] splits the provider's answer back into replies.

mod builder;
mod suggestions;

pub use builder::PromptBuilder;
pub use suggestions::parse_suggestions;
