//! Ollama local generation backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerationBackend, Prompt, status_error};
use crate::config::LocalModelConfig;
use crate::{Error, Result};

/// Local model served by an Ollama instance
pub struct OllamaBackend {
    client: Client,
    host: String,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    #[must_use]
    pub fn new(config: &LocalModelConfig) -> Self {
        Self {
            client: Client::new(),
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }

    fn build_request<'a>(&'a self, prompt: &'a Prompt) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt: &prompt.user,
            system: &prompt.system,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                top_p: self.top_p,
            },
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let url = format!("{}/api/generate", self.host);

        let response = self
            .client
            .post(&url)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(format!("ollama request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(status_error("ollama", response).await);
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("failed to parse ollama response: {e}")))?;

        let text = result.response.trim();
        if text.is_empty() {
            return Err(Error::MalformedResponse("ollama returned empty text".to_string()));
        }

        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
