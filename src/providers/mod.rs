//! Generation backends
//!
//! Available backends:
//! - Ollama for local model generation
//! - `OpenAI` chat completions for hosted generation

mod ollama;
mod openai;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;

/// Which slot of the fallback chain a backend fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Hosted,
    Extractive,
}

/// A system instruction plus the user-facing prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Trait for text generation backends
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a reply for the prompt
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` when the backend cannot be reached or
    /// rejects the request, `MalformedResponse` when its payload is unusable
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Map a non-success HTTP status into a backend error
pub(crate) async fn status_error(backend: &str, response: reqwest::Response) -> crate::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    crate::Error::BackendUnavailable(format!("{backend} returned {status}: {body}"))
}
