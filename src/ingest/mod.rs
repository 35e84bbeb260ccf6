//! Corpus ingestion from spreadsheets and the company website
//!
//! Everything here writes through [`KnowledgeRepo`]; the response pipeline
//! only ever reads what ends up stored.

mod scrape;
mod workbook;

pub use scrape::{KEY_PAGES, ScrapedPage, SiteScraper, category_for_path, extract_page, save_pages};
pub use workbook::{WORKBOOK_EXTENSIONS, is_workbook_name, parse_workbook};

use std::path::Path;

use serde_json::{Map, Value};

use crate::db::KnowledgeRepo;
use crate::knowledge::KnowledgeSource;
use crate::{Error, Result};

/// Longest cleaned text kept from a single page
pub const MAX_CLEAN_CHARS: usize = 10_000;

/// Words per stored website chunk
pub const CHUNK_WORDS: usize = 500;

/// Category used for spreadsheet rows without one
pub const DEFAULT_CATEGORY: &str = "General";

/// Collapse whitespace runs, trim, and cap the length
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_CLEAN_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Split text into chunks of at most `size` words
#[must_use]
pub fn chunk_words(text: &str, size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(size.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// One question/answer row from a spreadsheet export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqRow {
    pub category: String,
    pub question: String,
    pub answer: String,
}

/// Read a cell by either its capitalized or lowercase header
fn cell(row: &Map<String, Value>, capitalized: &str, lowercase: &str) -> String {
    let value = row
        .get(capitalized)
        .filter(|v| !is_blank(v))
        .or_else(|| row.get(lowercase));

    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Map header-keyed records onto rows
///
/// Headers may be `Category`/`category`, `Question`/`question` and
/// `Answer`/`answer`. Rows without an answer are skipped and a missing
/// category becomes `General`.
fn rows_from_records(records: &[Map<String, Value>]) -> Vec<FaqRow> {
    let parsed: Vec<FaqRow> = records
        .iter()
        .filter_map(|row| {
            let answer = cell(row, "Answer", "answer");
            if answer.is_empty() {
                return None;
            }
            let category = cell(row, "Category", "category");
            Some(FaqRow {
                category: if category.is_empty() {
                    DEFAULT_CATEGORY.to_string()
                } else {
                    category
                },
                question: cell(row, "Question", "question"),
                answer,
            })
        })
        .collect();

    tracing::debug!(total = records.len(), kept = parsed.len(), "spreadsheet rows parsed");
    parsed
}

/// Parse a JSON array of spreadsheet rows
///
/// # Errors
///
/// Returns error if the input is not a JSON array of objects
pub fn parse_rows(json: &str) -> Result<Vec<FaqRow>> {
    let records: Vec<Map<String, Value>> = serde_json::from_str(json)
        .map_err(|e| Error::Ingest(format!("expected a JSON array of rows: {e}")))?;

    Ok(rows_from_records(&records))
}

/// Read rows from a workbook (`.xlsx`/`.xls`) or a JSON row export
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn read_rows_file(path: &Path) -> Result<Vec<FaqRow>> {
    let bytes = std::fs::read(path)?;

    if is_workbook_name(&path.to_string_lossy()) {
        return parse_workbook(&bytes);
    }

    let json = String::from_utf8(bytes)
        .map_err(|_| Error::Ingest(format!("{} is not UTF-8 JSON", path.display())))?;
    parse_rows(&json)
}

/// Store spreadsheet rows, updating answers of rows already imported
///
/// # Errors
///
/// Returns error if a database write fails
pub fn import_rows(repo: &KnowledgeRepo, rows: &[FaqRow]) -> Result<usize> {
    for row in rows {
        let question = (!row.question.is_empty()).then_some(row.question.as_str());
        repo.upsert(
            &row.category,
            question,
            &row.answer,
            KnowledgeSource::Excel,
            &Value::Null,
        )?;
    }

    tracing::info!(count = rows.len(), "spreadsheet knowledge imported");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  We   build\n\n apps\t today "), "We build apps today");
    }

    #[test]
    fn test_clean_text_caps_length() {
        let long = "a".repeat(MAX_CLEAN_CHARS + 50);
        assert_eq!(clean_text(&long).chars().count(), MAX_CLEAN_CHARS);
    }

    #[test]
    fn test_chunk_words() {
        let text = (1..=1200).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        let chunks = chunk_words(&text, CHUNK_WORDS);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].split(' ').count(), 500);
        assert_eq!(chunks[2].split(' ').count(), 200);
        assert!(chunks[1].starts_with("501 "));
    }

    #[test]
    fn test_chunk_words_empty() {
        assert!(chunk_words("   ", CHUNK_WORDS).is_empty());
    }

    #[test]
    fn test_parse_rows_headers_and_defaults() {
        let json = r#"[
            {"Category": "Services", "Question": "Do you host?", "Answer": "Yes, we host."},
            {"category": "About", "question": "Where?", "answer": "Mumbai."},
            {"Question": "No category", "Answer": "Defaults apply."},
            {"Category": "Empty", "Question": "Skipped", "Answer": ""},
            {"Category": "Numbers", "Answer": 42}
        ]"#;

        let rows = parse_rows(json).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].category, "Services");
        assert_eq!(rows[1].answer, "Mumbai.");
        assert_eq!(rows[2].category, DEFAULT_CATEGORY);
        assert_eq!(rows[3].answer, "42");
        assert_eq!(rows[3].question, "");
    }

    #[test]
    fn test_parse_rows_rejects_non_array() {
        assert!(matches!(parse_rows(r#"{"a": 1}"#), Err(Error::Ingest(_))));
    }

    #[test]
    fn test_read_rows_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let workbook = dir.path().join("faq.xlsx");
        std::fs::write(&workbook, include_bytes!("../../tests/fixtures/faq.xlsx")).unwrap();
        assert_eq!(read_rows_file(&workbook).unwrap().len(), 3);

        let export = dir.path().join("faq.json");
        std::fs::write(&export, r#"[{"Answer": "Yes."}]"#).unwrap();
        assert_eq!(read_rows_file(&export).unwrap()[0].category, DEFAULT_CATEGORY);

        assert!(read_rows_file(&dir.path().join("missing.xlsx")).is_err());
    }

    #[test]
    fn test_import_rows_is_repeatable() {
        let repo = KnowledgeRepo::new(init_memory().unwrap());
        let mut rows = vec![FaqRow {
            category: "Services".to_string(),
            question: "Do you host?".to_string(),
            answer: "Yes.".to_string(),
        }];

        import_rows(&repo, &rows).unwrap();
        rows[0].answer = "Yes, on VPS too.".to_string();
        assert_eq!(import_rows(&repo, &rows).unwrap(), 1);

        let stored = repo.list().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].answer, "Yes, on VPS too.");
        assert_eq!(stored[0].source, KnowledgeSource::Excel);
    }
}
