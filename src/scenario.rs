//! Scenario text: retrieval-grounded generation and the fixed team-dynamics
//! template.

use crate::knowledge::KnowledgeSnippet;
use crate::logging;
use crate::openai::ChatMessage;
use crate::services::{call_with_retry, TextGenerator};
use std::sync::Arc;
use std::time::Duration;

pub const GENERATION_FAILED_TEXT: &str = "Scenario generation failed.";

pub const TEAM_DYNAMICS_SCENARIO: &str = r#"You are the leader of a project team. Work with the following members to move a DX project forward:
- Data analyst: proposes decisions grounded in data.
- Engineer: owns the technical implementation.
- Marketing: analyzes customer needs.
Propose an action plan for the team."#;

/// Fixed three-role team exercise, no external calls
pub fn team_scenario() -> &'static str {
    TEAM_DYNAMICS_SCENARIO
}

/// Outcome of a generation request
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioText {
    Generated(String),
    Failed { reason: String },
}

impl ScenarioText {
    /// Displayable text; failures show the fixed failure message
    pub fn into_text(self) -> String {
        match self {
            ScenarioText::Generated(text) => text,
            ScenarioText::Failed { .. } => GENERATION_FAILED_TEXT.to_string(),
        }
    }

    pub fn warning(&self) -> Option<String> {
        match self {
            ScenarioText::Failed { reason } => {
                Some(format!("An error occurred while generating the scenario: {}", reason))
            }
            ScenarioText::Generated(_) => None,
        }
    }
}

/// Two-part request: grounding context as the system turn, the topic as the
/// user turn. Sentinel snippets are embedded as-is.
pub fn build_messages(topic: &str, snippet: &KnowledgeSnippet) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "Create an exercise for the user based on the following information:\n\n{}",
            snippet.text()
        )),
        ChatMessage::user(format!("Create a scenario based on {}.", topic)),
    ]
}

pub struct ScenarioGenerator {
    generator: Arc<dyn TextGenerator>,
    model: String,
    timeout: Duration,
}

impl ScenarioGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, model: &str, timeout: Duration) -> Self {
        Self {
            generator,
            model: model.to_string(),
            timeout,
        }
    }

    /// Generate scenario text for `topic`. Never fails: service errors and
    /// timeouts degrade to `ScenarioText::Failed`.
    pub async fn generate(&self, topic: &str, snippet: &KnowledgeSnippet) -> ScenarioText {
        let messages = build_messages(topic, snippet);
        let messages = messages.as_slice();
        let generator = self.generator.as_ref();
        let model = self.model.as_str();

        let result = call_with_retry("text generation", self.timeout, move || {
            generator.complete(model, messages)
        })
        .await;

        match result {
            Ok(text) if !text.trim().is_empty() => {
                logging::log_generation(None, &format!(
                    "{}: generated {} chars with {}", topic, text.len(), model
                ));
                ScenarioText::Generated(text)
            }
            Ok(_) => {
                logging::log_error(None, &format!("Generation for '{}' returned empty text", topic));
                ScenarioText::Failed { reason: "empty completion".to_string() }
            }
            Err(e) => {
                logging::log_error(None, &format!("Generation for '{}' failed: {}", topic, e));
                ScenarioText::Failed { reason: e.to_string() }
            }
        }
    }
}
