//! Cosmetic cleanup of model-authored text.
//!
//! These regexes tidy answer text and placeholders for display. They are a
//! readability pass only: whether an item is answered is decided solely by
//! transcript-level evidence verification in [`crate::evidence`].

use lazy_static::lazy_static;
use regex::Regex;

/// Placeholder shown for unanswered items when none is configured.
pub const DEFAULT_PLACEHOLDER: &str = "(not mentioned in the transcript)";

lazy_static! {
    /// Markdown code fence markers, with or without a language tag
    static ref CODE_FENCE: Regex = Regex::new(r"```[A-Za-z0-9_-]*").unwrap();

    /// Leading "Answer:" style labels the model sometimes echoes
    static ref ANSWER_LABEL: Regex =
        Regex::new(r"^(?i:answer|a|回答|答え|こたえ)\s*[:：]\s*").unwrap();

    /// Bold/underline emphasis markers
    static ref EMPHASIS: Regex = Regex::new(r"\*\*|__").unwrap();

    /// Horizontal whitespace runs, including ideographic space
    static ref INLINE_WHITESPACE: Regex = Regex::new(r"[ \t\u{3000}]+").unwrap();

    /// Three or more consecutive line breaks
    static ref BLANK_LINES: Regex = Regex::new(r"\n\s*\n(\s*\n)+").unwrap();

    /// Control characters other than tab and newline
    static ref CONTROL: Regex = Regex::new(r"[\x00-\x08\x0B-\x1F\x7F]").unwrap();

    /// Phrases typical of instructions smuggled into a transcript
    static ref INJECTION_PHRASE: Regex = Regex::new(
        r"(?i)(ignore (all |any )?(previous|prior|above) instructions|answer (all questions )?regardless|disregard the (rules|evidence)|mark (everything|all) as answered|以前の指示を無視|指示を無視して|根拠に関係なく|すべて回答済み)"
    ).unwrap();
}

/// Tidy an answer for display. Returns an empty string for blank input.
pub fn sanitize_answer(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = CONTROL.replace_all(&text, "");
    let text = CODE_FENCE.replace_all(&text, "");
    let text = EMPHASIS.replace_all(&text, "");
    let text = INLINE_WHITESPACE.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    let trimmed = text.trim();
    ANSWER_LABEL.replace(trimmed, "").trim().to_string()
}

/// Flatten a placeholder to a single clean line, falling back to the default.
pub fn sanitize_placeholder(raw: &str) -> String {
    let text = CONTROL.replace_all(raw, " ");
    let text = text.replace('\n', " ");
    let text = INLINE_WHITESPACE.replace_all(&text, " ");
    let text = text.trim();
    if text.is_empty() {
        DEFAULT_PLACEHOLDER.to_string()
    } else {
        text.to_string()
    }
}

/// Whether `text` contains phrasing typical of a prompt-injection attempt.
///
/// Used for logging only.
pub fn looks_like_injection(text: &str) -> bool {
    INJECTION_PHRASE.is_match(text)
}
