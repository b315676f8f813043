//! Text cleanup applied before embedding.

use regex::Regex;
use std::sync::OnceLock;

fn hyphen_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-\r?\n").expect("valid regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn special_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s.,]").expect("valid regex"))
}

/// Normalize text for embedding.
///
/// Joins words hyphenated across line breaks, lowercases, collapses runs of
/// whitespace (line breaks included) to one space, trims, then drops every
/// character that is not a word character, whitespace, `.` or `,`.
pub fn normalize(text: &str) -> String {
    let text = hyphen_break().replace_all(text, "");
    let text = text.to_lowercase();
    let text = whitespace().replace_all(&text, " ");
    let text = text.trim();
    special_chars().replace_all(text, "").into_owned()
}
