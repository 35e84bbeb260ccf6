//! Deterministic extractive answers built from stored sentences

use std::sync::LazyLock;

use regex::Regex;

use super::normalize::normalize;
use crate::knowledge::{RetrievalResult, query_tokens};

/// Most query-matching sentences kept
const MAX_MATCHING_SENTENCES: usize = 3;

/// Leading sentences kept when nothing matches the query
const LEAD_SENTENCES: usize = 2;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("sentence end pattern is valid"));

/// Build an answer from the best-ranked result without calling a model
///
/// Keeps up to three sentences that mention a query token, otherwise the
/// first two sentences. Returns `None` only when the content has no
/// sentences at all.
#[must_use]
pub fn extract(query: &str, best: &RetrievalResult) -> Option<String> {
    let tokens = query_tokens(query);
    let sentences: Vec<&str> = SENTENCE_END
        .split(&best.content)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let matching: Vec<&str> = sentences
        .iter()
        .copied()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            tokens.iter().any(|t| lower.contains(t.as_str()))
        })
        .take(MAX_MATCHING_SENTENCES)
        .collect();

    let selected: Vec<&str> = if matching.is_empty() {
        sentences.into_iter().take(LEAD_SENTENCES).collect()
    } else {
        matching
    };

    if selected.is_empty() {
        return None;
    }

    let text = format!("{}.", selected.join(". "));
    Some(normalize(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(content: &str) -> RetrievalResult {
        RetrievalResult {
            content: content.to_string(),
            category: "Services".to_string(),
            source: "excel".to_string(),
            score: 10,
        }
    }

    #[test]
    fn test_single_matching_sentence() {
        let answer = extract(
            "Do you offer hosting?",
            &result("We offer web hosting and VPS hosting."),
        );
        assert_eq!(answer.as_deref(), Some("- We offer web hosting and VPS hosting."));
    }

    #[test]
    fn test_keeps_only_matching_sentences() {
        let answer = extract(
            "mobile apps",
            &result("We were founded in 2015. We build mobile apps! Our office is in Mumbai."),
        )
        .unwrap();
        assert_eq!(answer, "- We build mobile apps.");
    }

    #[test]
    fn test_caps_matching_sentences_at_three() {
        let answer = extract(
            "cloud",
            &result("Cloud one. Cloud two. Cloud three. Cloud four."),
        )
        .unwrap();
        assert_eq!(answer.lines().count(), 3);
        assert!(!answer.contains("four"));
    }

    #[test]
    fn test_falls_back_to_leading_sentences() {
        let answer = extract(
            "pricing",
            &result("We are a software firm. We value quality. We love tea."),
        )
        .unwrap();
        assert_eq!(answer, "- We are a software firm.\n- We value quality.");
    }

    #[test]
    fn test_content_without_sentences() {
        assert!(extract("anything", &result(" ... !? ")).is_none());
    }
}
