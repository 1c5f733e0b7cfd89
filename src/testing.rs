//! In-process stand-ins for the external collaborators, used by unit tests.

use crate::error::CoachError;
use crate::openai::ChatMessage;
use crate::services::{KnowledgeMatch, KnowledgeSearch, ProfileStore, TextGenerator};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct StubSearch {
    outcome: Result<Vec<String>, String>,
    queries: Mutex<Vec<(String, String)>>,
}

impl StubSearch {
    pub fn with_matches(contents: &[&str]) -> Self {
        Self {
            outcome: Ok(contents.iter().map(|c| c.to_string()).collect()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(reason.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeSearch for StubSearch {
    async fn query(&self, collection: &str, concept: &str) -> Result<Vec<KnowledgeMatch>, CoachError> {
        self.queries
            .lock()
            .unwrap()
            .push((collection.to_string(), concept.to_string()));
        match &self.outcome {
            Ok(contents) => Ok(contents
                .iter()
                .map(|c| KnowledgeMatch { content: c.clone() })
                .collect()),
            Err(reason) => Err(CoachError::Retrieval(reason.clone())),
        }
    }
}

enum Reply {
    Text(String),
    Fail(String),
    Hang,
}

pub struct StubGenerator {
    reply: Reply,
    requests: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl StubGenerator {
    fn new(reply: Reply) -> Self {
        Self { reply, requests: Mutex::new(Vec::new()) }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(Reply::Text(text.to_string()))
    }

    pub fn failing(reason: &str) -> Self {
        Self::new(Reply::Fail(reason.to_string()))
    }

    /// Never answers within any reasonable deadline
    pub fn hanging() -> Self {
        Self::new(Reply::Hang)
    }

    pub fn requests(&self) -> Vec<(String, Vec<ChatMessage>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, CoachError> {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(reason) => Err(CoachError::Generation(reason.clone())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(CoachError::Generation("woke up".into()))
            }
        }
    }
}

/// Profile store backed by a shared map so tests can inspect what was saved
#[derive(Default, Clone)]
pub struct MemoryStore {
    blobs: Arc<Mutex<HashMap<String, String>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn failing_writes() -> Self {
        Self { fail_writes: true, ..Self::default() }
    }

    /// Shared between clones, so a test can break reads mid-session
    pub fn set_failing_reads(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    pub fn put(&self, key: &str, body: &str) {
        self.blobs.lock().unwrap().insert(key.to_string(), body.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(key).cloned()
    }
}

impl ProfileStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, CoachError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CoachError::Store("database is locked".into()));
        }
        Ok(self.get(key))
    }

    fn save(&self, key: &str, body: &str) -> Result<(), CoachError> {
        if self.fail_writes {
            return Err(CoachError::Store("disk full".into()));
        }
        self.put(key, body);
        Ok(())
    }
}

/// Rng that always yields the same word, for forcing coin flips:
/// `FixedRng(0)` lands under any probability, `FixedRng(u64::MAX)` above it.
pub struct FixedRng(pub u64);

impl rand::RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        (self.0 >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        let bytes = self.0.to_le_bytes();
        for (i, b) in dst.iter_mut().enumerate() {
            *b = bytes[i % 8];
        }
    }
}
