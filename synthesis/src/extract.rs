//! Extraction of structured payloads from free model text.

use std::sync::OnceLock;

use regex::Regex;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[a-zA-Z0-9_+-]*[ \t]*\n?(.*?)```").expect("fence regex is valid")
    })
}

/// First fenced code block in `text`, or the raw text verbatim when no fence
/// is present. The model is expected to emit one fence; anything else is its
/// problem, not ours.
#[must_use]
pub fn extract_code_block(text: &str) -> String {
    fence_regex()
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map_or_else(|| text.trim().to_string(), |code| code.as_str().trim().to_string())
}

/// The outermost `{...}` region of `text`, for trace responses that wrap
/// their JSON in prose despite instructions.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
