//! Knowledge corpus types and retrieval
//!
//! - **ranker**: Score corpus entries against a query by lexical relevance
//! - **context**: Render ranked entries into a grounding context block

mod context;
mod ranker;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use context::assemble;
pub use ranker::{DEFAULT_RETRIEVAL_LIMIT, query_tokens, rank, score_entry};

use crate::Result;

/// Where a knowledge entry was imported from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeSource {
    /// Spreadsheet import
    Excel,
    /// Website scrape
    Website,
}

impl KnowledgeSource {
    /// Stable storage identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excel => "excel",
            Self::Website => "website",
        }
    }
}

impl fmt::Display for KnowledgeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnowledgeSource {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "excel" => Ok(Self::Excel),
            "website" => Ok(Self::Website),
            other => Err(crate::Error::Database(format!(
                "unknown knowledge source: {other}"
            ))),
        }
    }
}

/// A stored piece of company knowledge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEntry {
    pub id: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub answer: String,
    pub source: KnowledgeSource,
    /// Opaque key-value metadata (page title, url, chunk index, ...)
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    /// Build an entry with a fresh id and timestamps
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        question: Option<String>,
        answer: impl Into<String>,
        source: KnowledgeSource,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category: category.into(),
            question,
            answer: answer.into(),
            source,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A ranked corpus entry, recomputed on every query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalResult {
    pub content: String,
    pub category: String,
    pub source: String,
    /// Always positive; zero-score entries are never returned
    pub score: u32,
}

/// Read access to the knowledge corpus
///
/// Implemented by the database repository; the pipeline only ever reads
/// through this seam.
pub trait KnowledgeStore: Send + Sync {
    /// Return every stored entry, in storage order
    ///
    /// # Errors
    ///
    /// Returns error if the backing store cannot be read
    fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>>;
}

impl KnowledgeStore for Vec<KnowledgeEntry> {
    fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>> {
        Ok(self.clone())
    }
}
