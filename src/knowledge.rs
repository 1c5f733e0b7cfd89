// Knowledge retrieval for scenario grounding, plus the coach persona that
// opens every session transcript

use crate::logging;
use crate::services::{call_with_retry, KnowledgeSearch};
use std::sync::Arc;
use std::time::Duration;

pub const COACH_PERSONA: &str = r#"You are an AI coach that strengthens the user's ability to drive digital transformation. Support the user through the following:
1. Developing abstract thinking
2. Practicing systems thinking
3. Improving data analysis skills
4. Simulating virtual projects
5. Encouraging meta-cognition
6. Training ethical thinking"#;

pub const NOT_FOUND_TEXT: &str = "No relevant information was found.";
pub const SEARCH_FAILED_TEXT: &str = "The knowledge search failed.";

/// Result of a knowledge lookup. The sentinels still carry displayable text
/// because the generator embeds whatever it receives.
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeSnippet {
    Found(String),
    NotFound,
    SearchFailed { reason: String },
}

impl KnowledgeSnippet {
    pub fn text(&self) -> &str {
        match self {
            KnowledgeSnippet::Found(content) => content.as_str(),
            KnowledgeSnippet::NotFound => NOT_FOUND_TEXT,
            KnowledgeSnippet::SearchFailed { .. } => SEARCH_FAILED_TEXT,
        }
    }

    /// User-visible warning for a failed search
    pub fn warning(&self) -> Option<String> {
        match self {
            KnowledgeSnippet::SearchFailed { reason } => {
                Some(format!("An error occurred while searching the knowledge base: {}", reason))
            }
            _ => None,
        }
    }
}

pub struct KnowledgeRetriever {
    search: Arc<dyn KnowledgeSearch>,
    collection: String,
    timeout: Duration,
}

impl KnowledgeRetriever {
    pub fn new(search: Arc<dyn KnowledgeSearch>, collection: &str, timeout: Duration) -> Self {
        Self {
            search,
            collection: collection.to_string(),
            timeout,
        }
    }

    /// Best match for `topic`. Never fails: search errors degrade to
    /// `SearchFailed`.
    pub async fn retrieve(&self, topic: &str) -> KnowledgeSnippet {
        let search = self.search.as_ref();
        let collection = self.collection.as_str();

        let result = call_with_retry("knowledge search", self.timeout, move || {
            search.query(collection, topic)
        })
        .await;

        match result {
            Ok(matches) => match matches.into_iter().next() {
                Some(top) => {
                    logging::log_retrieval(None, &format!(
                        "{}: matched {} chars in {}", topic, top.content.len(), collection
                    ));
                    KnowledgeSnippet::Found(top.content)
                }
                None => {
                    logging::log_retrieval(None, &format!("{}: no match in {}", topic, collection));
                    KnowledgeSnippet::NotFound
                }
            },
            Err(e) => {
                logging::log_error(None, &format!("Knowledge search for '{}' failed: {}", topic, e));
                KnowledgeSnippet::SearchFailed { reason: e.to_string() }
            }
        }
    }
}
