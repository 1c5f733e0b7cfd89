//! Collaborator seams: knowledge search, text generation and profile storage.
//!
//! The core only talks to these traits, so alternate backends (or test stubs)
//! can be swapped in without touching the orchestration logic.

use crate::error::CoachError;
use crate::logging;
use crate::openai::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Attempts per collaborator call: the first try plus one retry
pub const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMatch {
    pub content: String,
}

/// Nearest-neighbor text search over a named collection
#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    /// Matches ordered best first
    async fn query(&self, collection: &str, concept: &str) -> Result<Vec<KnowledgeMatch>, CoachError>;
}

/// Chat-style completion service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, CoachError>;
}

/// Full-document blob store for the digital twin
pub trait ProfileStore: Send {
    /// `Ok(None)` when nothing has been saved under `key` yet
    fn load(&self, key: &str) -> Result<Option<String>, CoachError>;
    /// Overwrites any prior value in one step
    fn save(&self, key: &str, body: &str) -> Result<(), CoachError>;
}

/// Run a collaborator call with a per-attempt deadline, retrying once after a
/// failure or timeout. The last error is returned for the caller to degrade.
pub async fn call_with_retry<T, F, Fut>(
    service: &str,
    timeout: Duration,
    mut call: F,
) -> Result<T, CoachError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoachError>>,
{
    let mut attempt = 1;
    loop {
        let error = match tokio::time::timeout(timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => CoachError::Timeout {
                service: service.to_string(),
                after: timeout,
            },
        };

        if attempt >= MAX_ATTEMPTS {
            return Err(error);
        }

        logging::log_error(None, &format!(
            "{} attempt {}/{} failed, retrying: {}",
            service, attempt, MAX_ATTEMPTS, error
        ));
        attempt += 1;
    }
}
