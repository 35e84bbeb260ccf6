//! Knowledge repository for the company corpus

use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use super::{DbPool, connection, parse_datetime};
use crate::knowledge::{KnowledgeEntry, KnowledgeSource, KnowledgeStore};
use crate::{Error, Result};

/// Column list for all knowledge SELECT queries
const KNOWLEDGE_COLUMNS: &str =
    "id, category, question, answer, source, metadata, created_at, updated_at";

/// Raw column values, converted after the row borrow ends
struct KnowledgeRow {
    id: String,
    category: String,
    question: String,
    answer: String,
    source: String,
    metadata: String,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<KnowledgeRow> {
    Ok(KnowledgeRow {
        id: row.get(0)?,
        category: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        source: row.get(4)?,
        metadata: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl TryFrom<KnowledgeRow> for KnowledgeEntry {
    type Error = Error;

    fn try_from(row: KnowledgeRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            category: row.category,
            question: (!row.question.is_empty()).then_some(row.question),
            answer: row.answer,
            source: row.source.parse()?,
            metadata: serde_json::from_str(&row.metadata).unwrap_or(serde_json::Value::Null),
            created_at: parse_datetime(&row.created_at),
            updated_at: parse_datetime(&row.updated_at),
        })
    }
}

/// Knowledge repository for database operations
#[derive(Clone)]
pub struct KnowledgeRepo {
    pool: DbPool,
}

impl KnowledgeRepo {
    /// Create a new knowledge repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new entry
    ///
    /// # Errors
    ///
    /// Returns error if an entry with the same category, question and
    /// source exists, or the database operation fails
    pub fn insert(&self, entry: &KnowledgeEntry) -> Result<()> {
        let conn = connection(&self.pool)?;
        let metadata = serde_json::to_string(&entry.metadata)?;

        conn.execute(
            &format!(
                "INSERT INTO knowledge ({KNOWLEDGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                entry.id,
                entry.category,
                entry.question.as_deref().unwrap_or_default(),
                entry.answer,
                entry.source.as_str(),
                metadata,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Insert an entry or update the answer of the matching one
    ///
    /// Entries match on category, question and source. Returns the id of the
    /// stored entry.
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn upsert(
        &self,
        category: &str,
        question: Option<&str>,
        answer: &str,
        source: KnowledgeSource,
        metadata: &serde_json::Value,
    ) -> Result<String> {
        let conn = connection(&self.pool)?;
        let question = question.unwrap_or_default();
        let metadata = serde_json::to_string(metadata)?;
        let now = Utc::now().to_rfc3339();

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM knowledge WHERE category = ?1 AND question = ?2 AND source = ?3",
                params![category, question, source.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                "UPDATE knowledge SET answer = ?1, metadata = ?2, updated_at = ?3 WHERE id = ?4",
                params![answer, metadata, now, id],
            )?;
            tracing::debug!(id = %id, category, "knowledge entry updated");
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            &format!(
                "INSERT INTO knowledge ({KNOWLEDGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)"
            ),
            params![id, category, question, answer, source.as_str(), metadata, now],
        )?;
        tracing::debug!(id = %id, category, "knowledge entry created");

        Ok(id)
    }

    /// List every entry in insertion order
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails or a row is corrupt
    pub fn list(&self) -> Result<Vec<KnowledgeEntry>> {
        let conn = connection(&self.pool)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge ORDER BY rowid"
        ))?;

        let rows = stmt
            .query_map([], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(KnowledgeEntry::try_from).collect()
    }

    /// Count stored entries
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn count(&self) -> Result<u64> {
        let conn = connection(&self.pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM knowledge", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Delete every entry from one source, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn delete_by_source(&self, source: KnowledgeSource) -> Result<usize> {
        let conn = connection(&self.pool)?;
        let deleted = conn.execute("DELETE FROM knowledge WHERE source = ?1", [source.as_str()])?;

        tracing::info!(source = %source, deleted, "knowledge entries deleted");
        Ok(deleted)
    }

    /// Delete website chunks of one page from `from_index` onwards
    ///
    /// Pages are matched on `metadata.url`, chunks on `metadata.chunkIndex`.
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn delete_page_chunks_from(&self, url: &str, from_index: usize) -> Result<usize> {
        let conn = connection(&self.pool)?;
        let from_index = i64::try_from(from_index).unwrap_or(i64::MAX);
        let deleted = conn.execute(
            "DELETE FROM knowledge
             WHERE source = ?1
               AND json_extract(metadata, '$.url') = ?2
               AND json_extract(metadata, '$.chunkIndex') >= ?3",
            params![KnowledgeSource::Website.as_str(), url, from_index],
        )?;

        if deleted > 0 {
            tracing::debug!(url, deleted, "stale page chunks removed");
        }
        Ok(deleted)
    }
}

impl KnowledgeStore for KnowledgeRepo {
    fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>> {
        self.list()
    }
}
