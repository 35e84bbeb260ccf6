//! Question analytics repository

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use super::{DbPool, connection, parse_datetime};
use crate::Result;

/// How often a question was asked
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCount {
    pub question: String,
    pub count: u64,
    pub last_asked: DateTime<Utc>,
}

/// Totals across all asked questions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsStats {
    pub total_questions: u64,
    pub unique_questions: u64,
}

/// Analytics repository
#[derive(Clone)]
pub struct AnalyticsRepo {
    pool: DbPool,
}

impl AnalyticsRepo {
    /// Create a new analytics repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Count one more ask of a question
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn record(&self, question: &str) -> Result<()> {
        let conn = connection(&self.pool)?;
        conn.execute(
            "INSERT INTO analytics (question, count, last_asked) VALUES (?1, 1, ?2)
             ON CONFLICT(question) DO UPDATE SET count = count + 1, last_asked = excluded.last_asked",
            params![question, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// The most asked questions, most frequent first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn top_questions(&self, limit: usize) -> Result<Vec<QuestionCount>> {
        let conn = connection(&self.pool)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare(
            "SELECT question, count, last_asked FROM analytics
             ORDER BY count DESC, last_asked DESC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map([limit], |row| {
                Ok(QuestionCount {
                    question: row.get(0)?,
                    count: row.get::<_, i64>(1)?.unsigned_abs(),
                    last_asked: parse_datetime(&row.get::<_, String>(2)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Total asks and distinct questions
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn stats(&self) -> Result<AnalyticsStats> {
        let conn = connection(&self.pool)?;
        let (total, unique): (i64, i64) = conn.query_row(
            "SELECT COALESCE(SUM(count), 0), COUNT(*) FROM analytics",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(AnalyticsStats {
            total_questions: total.unsigned_abs(),
            unique_questions: unique.unsigned_abs(),
        })
    }
}
