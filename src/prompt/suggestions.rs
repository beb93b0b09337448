//! Splitting raw model output into individual reply suggestions.

use once_cell::sync::Lazy;
use regex::Regex;

static REPLY_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[ \t]*[*_#]*[ \t]*reply[ \t]+\d+[ \t]*[:.)]?[ \t]*[*_]*[ \t]*:?[ \t]*")
        .expect("reply marker pattern")
});

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+[.)][ \t]+").expect("numbered item pattern"));

/// Split provider text into at most `max` suggestions, in order.
///
/// Tries `**Reply N:**` blocks, then numbered list items, then plain non-empty lines.
/// Text with no recognisable structure becomes a single suggestion.
pub fn parse_suggestions(text: &str, max: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max == 0 {
        return Vec::new();
    }

    let mut out = split_on(&REPLY_MARKER, text);
    if out.is_empty() {
        out = split_on(&NUMBERED_ITEM, text);
    }
    if out.is_empty() {
        out = text
            .lines()
            .map(|l| l.trim().trim_start_matches(&['-', '•'][..]).trim())
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
    }
    out.truncate(max);
    out
}

fn split_on(marker: &Regex, text: &str) -> Vec<String> {
    let starts: Vec<(usize, usize)> = marker
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    if starts.is_empty() {
        return Vec::new();
    }
    starts
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start))| {
            let body_end = starts.get(i + 1).map(|&(s, _)| s).unwrap_or(text.len());
            text[body_start..body_end].trim().to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}
