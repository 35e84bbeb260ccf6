//! Grounding context assembly for generation prompts

use std::fmt::Write;

use super::RetrievalResult;
use crate::prompt::{CONTEXT_HEADER, EMPTY_CONTEXT};

/// Render ranked results into a context block, preserving rank order
///
/// Entries are numbered from 1 and separated by a blank line.
#[must_use]
pub fn assemble(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return EMPTY_CONTEXT.to_string();
    }

    let mut context = format!("{CONTEXT_HEADER}\n\n");
    for (index, result) in results.iter().enumerate() {
        let _ = write!(
            context,
            "[{}] Category: {}\nContent: {}\n\n",
            index + 1,
            result.category,
            result.content
        );
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(category: &str, content: &str, score: u32) -> RetrievalResult {
        RetrievalResult {
            content: content.to_string(),
            category: category.to_string(),
            source: "excel".to_string(),
            score,
        }
    }

    #[test]
    fn test_empty_results_yield_sentinel() {
        assert_eq!(
            assemble(&[]),
            "No relevant information found in the knowledge base."
        );
    }

    #[test]
    fn test_entries_numbered_in_rank_order() {
        let context = assemble(&[
            result("Services", "Web hosting", 20),
            result("Contact", "info@example.com", 4),
        ]);

        assert!(context.starts_with(CONTEXT_HEADER));
        let first = context.find("[1] Category: Services\nContent: Web hosting").unwrap();
        let second = context
            .find("[2] Category: Contact\nContent: info@example.com")
            .unwrap();
        assert!(first < second);
        assert!(context.contains("Web hosting\n\n[2]"));
    }
}
