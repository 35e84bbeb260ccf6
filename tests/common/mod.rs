//! Shared test utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use helpdesk_gateway::{
    DbPool, Error, GenerationBackend, KnowledgeEntry, KnowledgeSource, Prompt, Result, db,
};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Build a corpus entry
#[must_use]
pub fn entry(category: &str, question: Option<&str>, answer: &str) -> KnowledgeEntry {
    KnowledgeEntry::new(
        category,
        question.map(ToString::to_string),
        answer,
        KnowledgeSource::Excel,
    )
}

/// What a mock backend does when called
#[derive(Clone)]
pub enum Behavior {
    Reply(&'static str),
    Fail,
    Malformed,
    Broken,
    Hang(Duration),
    Panic,
}

/// Shared, ordered log of backend names as they are called
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Generation backend double that counts calls and records call order
pub struct MockBackend {
    name: &'static str,
    behavior: Behavior,
    calls: AtomicUsize,
    log: CallLog,
    last_prompt: Mutex<Option<Prompt>>,
}

impl MockBackend {
    pub fn new(name: &'static str, behavior: Behavior, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            calls: AtomicUsize::new(0),
            log: log.clone(),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(self.name);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());

        match &self.behavior {
            Behavior::Reply(text) => Ok((*text).to_string()),
            Behavior::Fail => Err(Error::BackendUnavailable("connection refused".to_string())),
            Behavior::Malformed => Err(Error::MalformedResponse("missing text".to_string())),
            Behavior::Broken => Err(Error::Io(std::io::Error::other("broken pipe"))),
            Behavior::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Ok("too late".to_string())
            }
            Behavior::Panic => panic!("backend blew up"),
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}
