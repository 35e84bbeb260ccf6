//! Response pipeline: gate, retrieval, generation fallback and normalization

mod extractive;
mod gate;
mod normalize;
mod orchestrator;

pub use extractive::extract;
pub use gate::{Intent, classify};
pub use normalize::{normalize, split_sentences};
pub use orchestrator::{GenerationAttempt, Pipeline, Reply, Resolution, Stage, Step, Turn};
