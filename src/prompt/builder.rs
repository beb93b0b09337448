use crate::providers::{GenerateOptions, GenerationPrompt};
use crate::types::ReplyRequest;
use std::fmt::Write as _;

const FULL_REASON: &str =
    "Add a brief explanation (1 line) after each suggestion about why it works";
const SHORT_REASON: &str = "Add very brief reason";

/// Above this many suggestions the per-reply explanation is shortened to save output tokens.
const VERBOSE_REASON_LIMIT: u8 = 3;

/// Renders the generation prompt for a request.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, request: &ReplyRequest) -> GenerationPrompt {
        GenerationPrompt {
            text: self.render(request),
            image: request.image().cloned(),
            options: GenerateOptions {
                max_suggestions: request.suggestion_count(),
                length_hint: request.length(),
            },
        }
    }

    pub fn render(&self, request: &ReplyRequest) -> String {
        let n = request.suggestion_count();
        let reason = if n > VERBOSE_REASON_LIMIT {
            SHORT_REASON
        } else {
            FULL_REASON
        };
        let context = request.extra_context().unwrap_or("None");

        let mut out = String::new();
        let _ = write!(
            out,
            "You are an expert communication specialist. \
             Analyze the conversation and generate {n} different reply suggestions.\n\
             \n\
             Mood/Tone: {mood}\n\
             Reply Length: {length}\n\
             \n\
             Additional Context: {context}\n\
             \n\
             Instructions:\n\
             1. Read the conversation carefully\n\
             2. Generate {n} unique replies matching the mood and length\n\
             3. Make replies natural and contextually appropriate\n\
             4. Number each suggestion\n\
             5. {reason}\n\
             \n\
             Format:\n",
            n = n,
            mood = request.mood().instruction(),
            length = request.length().guide(),
            context = context,
            reason = reason,
        );
        for i in 1..=n.min(2) {
            let _ = write!(
                out,
                "**Reply {i}:**\n[Your reply]\n*Why it works: [Brief explanation]*\n\n"
            );
        }

        let text = request.source_text().trim();
        if request.image().is_some() {
            out.push_str("\nAnalyze the conversation in the image.");
            if !text.is_empty() {
                let _ = write!(out, "\n\nAdditional text:\n{}", text);
            }
        } else {
            let _ = write!(out, "\nConversation:\n{}", text);
        }
        out
    }
}
