use std::sync::LazyLock;

use regex::Regex;

/// Maximum excerpt length, in characters, shown per entry.
pub const DEFAULT_EXCERPT_BUDGET: usize = 280;

pub const ELLIPSIS: char = '\u{2026}';

/// A newline with whitespace on both sides (soft-wrap artifact).
static WRAPPED_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\n\s+").expect("valid regex"));

static HORIZONTAL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));

/// Normalize rendered message text for display.
///
/// In order: non-breaking spaces become spaces, a newline surrounded by
/// whitespace collapses to a bare newline, runs of two or more spaces/tabs
/// become one space, and the result is trimmed. Idempotent.
pub fn normalize_text(raw: &str) -> String {
    let text = raw.replace('\u{00A0}', " ");
    let text = WRAPPED_NEWLINE.replace_all(&text, "\n");
    let text = HORIZONTAL_RUN.replace_all(&text, " ");
    text.trim().to_string()
}

/// Normalize, then hard-cut to `budget` characters.
///
/// Text over budget keeps `budget - 1` characters followed by an ellipsis, so
/// the result never exceeds `budget` characters.
pub fn excerpt(raw: &str, budget: usize) -> String {
    let text = normalize_text(raw);
    if text.chars().count() <= budget {
        return text;
    }
    if budget == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(budget - 1).collect();
    cut.push(ELLIPSIS);
    cut
}
