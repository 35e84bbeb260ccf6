//! Lexical relevance ranking over the knowledge corpus

use super::{KnowledgeEntry, RetrievalResult};

/// Default number of entries returned by [`rank`]
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 5;

/// Points per occurrence of a query token in the searchable text
const OCCURRENCE_WEIGHT: u32 = 2;

/// Points when the entry's category contains a query token
const CATEGORY_BONUS: u32 = 5;

/// Points when the searchable text contains the whole query
///
/// Added once per query token, so long queries that match verbatim
/// are weighted heavily.
const PHRASE_BONUS: u32 = 10;

/// Split a query into lower-cased whitespace tokens longer than two chars
#[must_use]
pub fn query_tokens(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .map(ToString::to_string)
        .collect()
}

/// Score one entry against a query
///
/// `query_lower` is the full lower-cased query, `tokens` its filtered tokens.
#[must_use]
pub fn score_entry(entry: &KnowledgeEntry, query_lower: &str, tokens: &[String]) -> u32 {
    let searchable = format!(
        "{} {}",
        entry.answer,
        entry.question.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    let category = entry.category.to_lowercase();
    let phrase_match = searchable.contains(query_lower);

    let mut score: u32 = 0;
    for token in tokens {
        let occurrences = u32::try_from(searchable.matches(token.as_str()).count())
            .unwrap_or(u32::MAX);
        score = score.saturating_add(occurrences.saturating_mul(OCCURRENCE_WEIGHT));

        if phrase_match {
            score = score.saturating_add(PHRASE_BONUS);
        }

        if category.contains(token.as_str()) {
            score = score.saturating_add(CATEGORY_BONUS);
        }
    }

    score
}

/// Rank the corpus against a query and return the top `limit` entries
///
/// Entries scoring zero are dropped. Ties keep corpus order.
#[must_use]
pub fn rank(query: &str, corpus: &[KnowledgeEntry], limit: usize) -> Vec<RetrievalResult> {
    let query_lower = query.to_lowercase();
    let tokens = query_tokens(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<RetrievalResult> = corpus
        .iter()
        .filter_map(|entry| {
            let score = score_entry(entry, &query_lower, &tokens);
            (score > 0).then(|| RetrievalResult {
                content: entry.answer.clone(),
                category: entry.category.clone(),
                source: entry.source.to_string(),
                score,
            })
        })
        .collect();

    // `sort_by` is stable, which keeps ties in corpus order
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(limit);

    tracing::debug!(
        tokens = tokens.len(),
        corpus = corpus.len(),
        returned = scored.len(),
        "ranked knowledge"
    );

    scored
}
