//! Response normalization into one-bullet-per-sentence text

use std::sync::LazyLock;

use regex::Regex;

/// Sentence-terminal punctuation followed by whitespace
static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence break pattern is valid"));

/// Whether the text already carries bullet formatting
fn is_bulleted(text: &str) -> bool {
    text.trim().starts_with("- ") || text.contains("\n- ")
}

/// Split text into sentences, keeping terminal punctuation with its sentence
#[must_use]
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_BREAK.find_iter(text) {
        // Punctuation is ASCII, so `m.start() + 1` is a char boundary
        sentences.push(&text[start..=m.start()]);
        start = m.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Convert free text into bullet lines
///
/// Already-bulleted text passes through untouched, so normalizing twice
/// is the same as normalizing once.
#[must_use]
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    if is_bulleted(text) {
        return text.to_string();
    }

    split_sentences(text)
        .into_iter()
        .map(|sentence| format!("- {sentence}"))
        .collect::<Vec<_>>()
        .join("\n")
}
