//! Helpdesk Gateway - retrieval-grounded support assistant
//!
//! This library answers visitor questions about a single company from a
//! stored knowledge corpus:
//! - Safety and small-talk gate
//! - Keyword relevance ranking over the corpus
//! - Grounded generation with a local model, a hosted model, and an
//!   extractive fallback
//! - Bullet-point response normalization
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              HTTP API / CLI                          │
//! │   chat  │  admin import/scrape  │  analytics        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Pipeline                            │
//! │  Gate → Ranker → Context → Orchestrator → Normalize │
//! └──────────┬─────────────────────────┬────────────────┘
//!            │                         │
//! ┌──────────▼──────────┐   ┌──────────▼────────────────┐
//! │  SQLite corpus      │   │  Ollama │ OpenAI          │
//! └─────────────────────┘   └───────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod knowledge;
pub mod pipeline;
pub mod prompt;
pub mod providers;

pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
pub use knowledge::{KnowledgeEntry, KnowledgeSource, KnowledgeStore, RetrievalResult};
pub use pipeline::{Pipeline, Reply, Resolution};
pub use providers::{BackendKind, GenerationBackend, Prompt};
