//! Safety and small-talk gate, run before any retrieval or generation

use serde::Serialize;

use crate::prompt::{GREETING_MESSAGE, REFUSAL_MESSAGE};

/// Terms that make the assistant refuse outright
const FORBIDDEN_TERMS: &[&str] = &[
    "fuck", "shit", "bitch", "bastard", "asshole", "porn", "sex", "nude", "naked",
];

/// Greetings and pleasantries answered without retrieval
const SMALL_TALK_PHRASES: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "how are you",
    "what's up",
    "whats up",
];

/// How an utterance should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Contains a forbidden term; answered with the refusal
    Forbidden,
    /// Greeting or pleasantry; answered with the greeting
    SmallTalk,
    /// Needs retrieval and generation
    Substantive,
}

impl Intent {
    /// The fixed reply for terminal intents
    #[must_use]
    pub const fn fixed_reply(self) -> Option<&'static str> {
        match self {
            Self::Forbidden => Some(REFUSAL_MESSAGE),
            Self::SmallTalk => Some(GREETING_MESSAGE),
            Self::Substantive => None,
        }
    }
}

/// Classify an utterance
///
/// Matching is case-insensitive substring matching; forbidden terms win
/// over small talk.
#[must_use]
pub fn classify(text: &str) -> Intent {
    let normalized = text.to_lowercase();

    if FORBIDDEN_TERMS.iter().any(|term| normalized.contains(term)) {
        return Intent::Forbidden;
    }

    if SMALL_TALK_PHRASES
        .iter()
        .any(|phrase| normalized.contains(phrase))
    {
        return Intent::SmallTalk;
    }

    Intent::Substantive
}
