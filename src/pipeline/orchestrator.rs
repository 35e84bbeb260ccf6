//! Generation orchestration over the backend fallback chain
//!
//! Stages run in a fixed order and each one either finishes the turn or
//! names the next stage:
//!
//! ```text
//! retrieval ──empty──► NoKnowledge ──► hosted(raw query) | fixed reply
//!     │
//!     └─results──► Local ──fail──► Hosted ──fail──► Extractive (always answers)
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;

use super::extractive::extract;
use super::gate::{Intent, classify};
use super::normalize::normalize;
use crate::config::PipelineConfig;
use crate::knowledge::{KnowledgeStore, RetrievalResult, assemble, rank};
use crate::prompt;
use crate::providers::{BackendKind, GenerationBackend, OllamaBackend, OpenAiBackend, Prompt};
use crate::{Error, Result};

/// How a turn was finally answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Forbidden term; fixed refusal
    Refused,
    /// Greeting; fixed reply
    SmallTalk,
    /// Local model answered
    Local,
    /// Hosted model answered
    Hosted,
    /// Built from stored sentences
    Extractive,
    /// Nothing relevant stored and no model could help
    NoKnowledge,
    /// Unexpected fault; fixed apology
    Fault,
}

/// One backend call made while answering a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationAttempt {
    pub backend: BackendKind,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The answer to one utterance plus how it was produced
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    /// Bullet-formatted, never empty
    pub text: String,
    pub resolution: Resolution,
    pub attempts: Vec<GenerationAttempt>,
    /// Ranked entries used as grounding, best first
    pub sources: Vec<RetrievalResult>,
}

/// Stages of the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Retrieval found nothing
    NoKnowledge,
    /// Local model with grounding context
    Local,
    /// Hosted model with the raw query
    Hosted,
    /// Deterministic sentence extraction
    Extractive,
}

/// Outcome of running one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The turn is answered
    Done { text: String, resolution: Resolution },
    /// Continue with another stage
    Next(Stage),
}

/// The per-turn inputs every stage reads
#[derive(Debug, Clone)]
pub struct Turn {
    pub query: String,
    pub results: Vec<RetrievalResult>,
    pub context: String,
}

impl Turn {
    /// Build a turn, assembling the grounding context from the results
    #[must_use]
    pub fn new(query: impl Into<String>, results: Vec<RetrievalResult>) -> Self {
        let context = assemble(&results);
        Self {
            query: query.into(),
            results,
            context,
        }
    }
}

/// A backend plus the bound on each of its calls
#[derive(Clone)]
struct BackendSlot {
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
}

/// Retrieval-grounded response pipeline
///
/// Stateless per call; the only shared input is read access to the corpus.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn KnowledgeStore>,
    retrieval_limit: usize,
    local: Option<BackendSlot>,
    hosted: Option<BackendSlot>,
}

impl Pipeline {
    /// Create a pipeline with no model backends (extractive answers only)
    #[must_use]
    pub fn new(store: Arc<dyn KnowledgeStore>, retrieval_limit: usize) -> Self {
        Self {
            store,
            retrieval_limit: retrieval_limit.max(1),
            local: None,
            hosted: None,
        }
    }

    /// Create a pipeline with the backends described by configuration
    #[must_use]
    pub fn from_config(store: Arc<dyn KnowledgeStore>, config: &PipelineConfig) -> Self {
        let mut pipeline = Self::new(store, config.retrieval_limit);

        if config.local.enabled {
            pipeline = pipeline.with_local(
                Arc::new(OllamaBackend::new(&config.local)),
                config.local.timeout,
            );
        }

        if let Some(hosted) = &config.hosted {
            pipeline = pipeline.with_hosted(Arc::new(OpenAiBackend::new(hosted)), hosted.timeout);
        }

        tracing::info!(
            local = pipeline.local.is_some(),
            hosted = pipeline.hosted.is_some(),
            retrieval_limit = pipeline.retrieval_limit,
            "response pipeline ready"
        );

        pipeline
    }

    /// Attach the local model backend
    #[must_use]
    pub fn with_local(mut self, backend: Arc<dyn GenerationBackend>, timeout: Duration) -> Self {
        self.local = Some(BackendSlot { backend, timeout });
        self
    }

    /// Attach the hosted model backend
    #[must_use]
    pub fn with_hosted(mut self, backend: Arc<dyn GenerationBackend>, timeout: Duration) -> Self {
        self.hosted = Some(BackendSlot { backend, timeout });
        self
    }

    /// Whether a local backend is attached
    #[must_use]
    pub const fn has_local(&self) -> bool {
        self.local.is_some()
    }

    /// Whether a hosted backend is attached
    #[must_use]
    pub const fn has_hosted(&self) -> bool {
        self.hosted.is_some()
    }

    /// Answer an utterance with bullet-formatted text
    ///
    /// Never fails and never returns an empty string.
    pub async fn respond(&self, message: &str) -> String {
        self.respond_detailed(message).await.text
    }

    /// Answer an utterance, reporting how the answer was produced
    pub async fn respond_detailed(&self, message: &str) -> Reply {
        let intent = classify(message);
        if let Some(text) = intent.fixed_reply() {
            let resolution = if intent == Intent::Forbidden {
                Resolution::Refused
            } else {
                Resolution::SmallTalk
            };
            tracing::debug!(?intent, "answered by gate");
            return Reply {
                text: text.to_string(),
                resolution,
                attempts: Vec::new(),
                sources: Vec::new(),
            };
        }

        let mut attempts = Vec::new();
        let outcome = AssertUnwindSafe(self.answer(message, &mut attempts))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok((text, resolution, sources))) => {
                tracing::info!(
                    ?resolution,
                    attempts = attempts.len(),
                    sources = sources.len(),
                    "response generated"
                );
                Reply {
                    text,
                    resolution,
                    attempts,
                    sources,
                }
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "error generating response");
                Self::fault_reply(attempts)
            }
            Err(_) => {
                tracing::error!("response pipeline panicked");
                Self::fault_reply(attempts)
            }
        }
    }

    fn fault_reply(attempts: Vec<GenerationAttempt>) -> Reply {
        Reply {
            text: prompt::apology_reply(),
            resolution: Resolution::Fault,
            attempts,
            sources: Vec::new(),
        }
    }

    /// Retrieve, then drive the stage machine to a terminal step
    async fn answer(
        &self,
        query: &str,
        attempts: &mut Vec<GenerationAttempt>,
    ) -> Result<(String, Resolution, Vec<RetrievalResult>)> {
        let corpus = self.store.list_knowledge()?;
        let results = rank(query, &corpus, self.retrieval_limit);
        let turn = Turn::new(query, results);

        let mut stage = if turn.results.is_empty() {
            Stage::NoKnowledge
        } else {
            Stage::Local
        };

        loop {
            tracing::debug!(?stage, "entering stage");
            match self.run_stage(stage, &turn, attempts).await {
                Step::Done { text, resolution } => return Ok((text, resolution, turn.results)),
                Step::Next(next) => stage = next,
            }
        }
    }

    /// Run a single stage of the fallback chain
    ///
    /// Backend failures are recorded in `attempts` and turn into `Step::Next`.
    pub async fn run_stage(
        &self,
        stage: Stage,
        turn: &Turn,
        attempts: &mut Vec<GenerationAttempt>,
    ) -> Step {
        match stage {
            Stage::NoKnowledge => {
                if let Some(slot) = &self.hosted {
                    let request = Prompt {
                        system: prompt::HOSTED_SYSTEM_PROMPT.to_string(),
                        user: prompt::hosted_prompt(&turn.query),
                    };
                    if let Some(text) = call(slot, BackendKind::Hosted, &request, attempts).await {
                        return done(text, Resolution::Hosted);
                    }
                }
                done(prompt::no_knowledge_reply(), Resolution::NoKnowledge)
            }
            Stage::Local => {
                let Some(slot) = &self.local else {
                    return Step::Next(Stage::Hosted);
                };
                let request = Prompt {
                    system: prompt::LOCAL_SYSTEM_PROMPT.to_string(),
                    user: prompt::local_prompt(&turn.context, &turn.query),
                };
                match call(slot, BackendKind::Local, &request, attempts).await {
                    Some(text) => done(text, Resolution::Local),
                    None => Step::Next(Stage::Hosted),
                }
            }
            Stage::Hosted => {
                let Some(slot) = &self.hosted else {
                    return Step::Next(Stage::Extractive);
                };
                let request = Prompt {
                    system: prompt::HOSTED_SYSTEM_PROMPT.to_string(),
                    user: prompt::hosted_prompt(&turn.query),
                };
                match call(slot, BackendKind::Hosted, &request, attempts).await {
                    Some(text) => done(text, Resolution::Hosted),
                    None => Step::Next(Stage::Extractive),
                }
            }
            Stage::Extractive => {
                let answer = turn
                    .results
                    .first()
                    .and_then(|best| extract(&turn.query, best));
                attempts.push(GenerationAttempt {
                    backend: BackendKind::Extractive,
                    succeeded: answer.is_some(),
                    error: None,
                });
                match answer {
                    Some(text) => done(text, Resolution::Extractive),
                    None => done(prompt::no_knowledge_reply(), Resolution::NoKnowledge),
                }
            }
        }
    }
}

fn done(text: String, resolution: Resolution) -> Step {
    Step::Done { text, resolution }
}

/// Call a backend under its timeout and normalize the reply
///
/// Every failure, panics included, is recorded in `attempts` and yields
/// `None` so the chain moves on.
async fn call(
    slot: &BackendSlot,
    kind: BackendKind,
    request: &Prompt,
    attempts: &mut Vec<GenerationAttempt>,
) -> Option<String> {
    let generation = AssertUnwindSafe(slot.backend.generate(request)).catch_unwind();
    let result = match tokio::time::timeout(slot.timeout, generation).await {
        Err(_) => Err(Error::BackendTimeout(slot.timeout)),
        Ok(Err(_)) => Err(Error::BackendUnavailable(format!(
            "{} panicked while generating",
            slot.backend.name()
        ))),
        Ok(Ok(result)) => result,
    }
    .and_then(|text| {
        let normalized = normalize(text.trim());
        if normalized.trim().is_empty() {
            Err(Error::MalformedResponse("empty reply".to_string()))
        } else {
            Ok(normalized)
        }
    });

    match result {
        Ok(text) => {
            tracing::debug!(backend = slot.backend.name(), ?kind, "backend answered");
            attempts.push(GenerationAttempt {
                backend: kind,
                succeeded: true,
                error: None,
            });
            Some(text)
        }
        Err(e) => {
            if e.is_backend_failure() {
                tracing::warn!(
                    backend = slot.backend.name(),
                    ?kind,
                    error = %e,
                    "backend failed, trying next stage"
                );
            } else {
                tracing::error!(
                    backend = slot.backend.name(),
                    ?kind,
                    error = %e,
                    "unexpected backend error, trying next stage"
                );
            }
            attempts.push(GenerationAttempt {
                backend: kind,
                succeeded: false,
                error: Some(e.to_string()),
            });
            None
        }
    }
}
