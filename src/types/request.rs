//! Reply requests: what the caller wants suggestions for, and in which style.

use super::image::{ImageAttachment, ImageDigest};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest number of suggestions a request may ask for.
pub const MIN_SUGGESTIONS: u8 = 1;
/// Largest number of suggestions a request may ask for.
pub const MAX_SUGGESTIONS: u8 = 5;

/// Tone of the generated replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Flirty,
    Romantic,
    Casual,
    Professional,
    Networking,
    Humorous,
    Cold,
    Bold,
    Thoughtful,
    Supportive,
}

impl Mood {
    pub const ALL: [Mood; 10] = [
        Mood::Flirty,
        Mood::Romantic,
        Mood::Casual,
        Mood::Professional,
        Mood::Networking,
        Mood::Humorous,
        Mood::Cold,
        Mood::Bold,
        Mood::Thoughtful,
        Mood::Supportive,
    ];

    /// Stable identifier, used in fingerprints and configuration.
    pub fn id(&self) -> &'static str {
        match self {
            Mood::Flirty => "flirty",
            Mood::Romantic => "romantic",
            Mood::Casual => "casual",
            Mood::Professional => "professional",
            Mood::Networking => "networking",
            Mood::Humorous => "humorous",
            Mood::Cold => "cold",
            Mood::Bold => "bold",
            Mood::Thoughtful => "thoughtful",
            Mood::Supportive => "supportive",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Flirty => "Flirty & Playful",
            Mood::Romantic => "Romantic & Sweet",
            Mood::Casual => "Casual & Friendly",
            Mood::Professional => "Professional & Formal",
            Mood::Networking => "Business Networking",
            Mood::Humorous => "Humorous & Witty",
            Mood::Cold => "Cold & Detached",
            Mood::Bold => "Bold & Confident",
            Mood::Thoughtful => "Thoughtful & Deep",
            Mood::Supportive => "Supportive & Caring",
        }
    }

    /// Tone instruction placed into the generation prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Mood::Flirty => {
                "Generate flirty, playful, and charming replies with subtle teasing and \
                 romantic undertones. Be confident and engaging."
            }
            Mood::Romantic => {
                "Generate sweet, romantic, and heartfelt replies that show genuine affection \
                 and care."
            }
            Mood::Casual => {
                "Generate casual, friendly, and relaxed replies as if talking to a good friend."
            }
            Mood::Professional => {
                "Generate professional, formal, and polished replies suitable for work \
                 environments."
            }
            Mood::Networking => {
                "Generate professional networking replies that build rapport and maintain \
                 business relationships."
            }
            Mood::Humorous => {
                "Generate funny, witty, and clever replies that will make them laugh."
            }
            Mood::Cold => "Generate brief, distant, and emotionally detached replies.",
            Mood::Bold => "Generate bold, assertive, and confident replies that command respect.",
            Mood::Thoughtful => "Generate thoughtful, introspective, and meaningful replies.",
            Mood::Supportive => {
                "Generate supportive, empathetic, and caring replies that show understanding."
            }
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mood {
    type Err = Error;

    /// Accepts the id (`"flirty"`) or the display label (`"Flirty & Playful"`), ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        Mood::ALL
            .iter()
            .copied()
            .find(|m| m.id() == needle || m.label().to_lowercase() == needle)
            .ok_or_else(|| {
                Error::validation_with_context(
                    format!("unknown mood '{}'", s.trim()),
                    ErrorContext::new()
                        .with_field_path("request.mood")
                        .with_details(format!(
                            "expected one of: {}",
                            Mood::ALL.iter().map(|m| m.id()).collect::<Vec<_>>().join(", ")
                        )),
                )
            })
    }
}

/// Target length of each reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyLength {
    Short,
    Medium,
    Long,
}

impl ReplyLength {
    pub const ALL: [ReplyLength; 3] = [ReplyLength::Short, ReplyLength::Medium, ReplyLength::Long];

    pub fn id(&self) -> &'static str {
        match self {
            ReplyLength::Short => "short",
            ReplyLength::Medium => "medium",
            ReplyLength::Long => "long",
        }
    }

    pub fn guide(&self) -> &'static str {
        match self {
            ReplyLength::Short => "Keep replies brief (1-2 sentences)",
            ReplyLength::Medium => "Make replies moderate length (2-3 sentences)",
            ReplyLength::Long => "Create detailed, expressive replies (3-5 sentences)",
        }
    }
}

impl fmt::Display for ReplyLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ReplyLength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        ReplyLength::ALL
            .iter()
            .copied()
            .find(|l| l.id() == needle)
            .ok_or_else(|| {
                Error::validation_with_context(
                    format!("unknown reply length '{}'", s.trim()),
                    ErrorContext::new()
                        .with_field_path("request.length")
                        .with_details("expected one of: short, medium, long"),
                )
            })
    }
}

/// An immutable request for reply suggestions.
///
/// Built through [`ReplyRequest::builder`], which enforces the suggestion-count range and
/// requires either conversation text or a screenshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    source_text: String,
    image: Option<ImageAttachment>,
    mood: Mood,
    length: ReplyLength,
    suggestion_count: u8,
    extra_context: Option<String>,
}

impl ReplyRequest {
    pub fn builder() -> ReplyRequestBuilder {
        ReplyRequestBuilder::new()
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    pub fn image_digest(&self) -> Option<ImageDigest> {
        self.image.as_ref().map(|i| i.digest())
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn length(&self) -> ReplyLength {
        self.length
    }

    pub fn suggestion_count(&self) -> u8 {
        self.suggestion_count
    }

    pub fn extra_context(&self) -> Option<&str> {
        self.extra_context.as_deref()
    }
}

/// Builder for [`ReplyRequest`].
#[derive(Debug, Clone)]
pub struct ReplyRequestBuilder {
    source_text: String,
    image: Option<ImageAttachment>,
    mood: Mood,
    length: ReplyLength,
    suggestion_count: u8,
    extra_context: Option<String>,
}

impl ReplyRequestBuilder {
    pub fn new() -> Self {
        Self {
            source_text: String::new(),
            image: None,
            mood: Mood::Flirty,
            length: ReplyLength::Medium,
            suggestion_count: 3,
            extra_context: None,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.source_text = text.into();
        self
    }

    pub fn image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    pub fn mood(mut self, mood: Mood) -> Self {
        self.mood = mood;
        self
    }

    pub fn length(mut self, length: ReplyLength) -> Self {
        self.length = length;
        self
    }

    pub fn suggestion_count(mut self, count: u8) -> Self {
        self.suggestion_count = count;
        self
    }

    pub fn extra_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.extra_context = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }

    pub fn build(self) -> Result<ReplyRequest> {
        if !(MIN_SUGGESTIONS..=MAX_SUGGESTIONS).contains(&self.suggestion_count) {
            return Err(Error::validation_with_context(
                "suggestion count out of range",
                ErrorContext::new()
                    .with_field_path("request.suggestion_count")
                    .with_details(format!(
                        "expected {}..={}, got {}",
                        MIN_SUGGESTIONS, MAX_SUGGESTIONS, self.suggestion_count
                    ))
                    .with_source("request_builder"),
            ));
        }
        if self.source_text.trim().is_empty() && self.image.is_none() {
            return Err(Error::validation_with_context(
                "a conversation text or screenshot is required",
                ErrorContext::new()
                    .with_field_path("request.source_text")
                    .with_source("request_builder"),
            ));
        }
        Ok(ReplyRequest {
            source_text: self.source_text,
            image: self.image,
            mood: self.mood,
            length: self.length,
            suggestion_count: self.suggestion_count,
            extra_context: self.extra_context,
        })
    }
}

impl Default for ReplyRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
