//! Error types for the helpdesk gateway

use std::time::Duration;

use thiserror::Error;

/// Result type alias for helpdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the helpdesk gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Generation backend could not be reached or refused the request
    /// (connection refused, auth error, rate limit, server error)
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Generation backend did not answer within its bound
    #[error("backend timed out after {0:?}")]
    BackendTimeout(Duration),

    /// Generation backend answered with a payload we could not use
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// Content ingestion error (scrape, spreadsheet import)
    #[error("ingest error: {0}")]
    Ingest(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Whether this error is an ordinary backend failure (unreachable, slow or
    /// malformed) rather than a bug in a backend
    #[must_use]
    pub const fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable(_)
                | Self::BackendTimeout(_)
                | Self::MalformedResponse(_)
                | Self::Http(_)
        )
    }
}
