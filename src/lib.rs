pub mod config;
pub mod error;
pub mod knowledge;
pub mod logging;
pub mod openai;
pub mod orchestrator;
pub mod provocations;
pub mod scenario;
pub mod services;
pub mod store;
pub mod twin;
pub mod weaviate;

#[cfg(test)]
mod testing;

use config::CoachConfig;
use error::CoachError;
use knowledge::{KnowledgeRetriever, COACH_PERSONA};
use openai::{ChatMessage, OpenAIClient};
use orchestrator::{ScenarioOrchestrator, ScenarioOutcome, ScenarioRoute};
use provocations::{pick_challenge, ProvocationModel};
use rand::Rng;
use scenario::ScenarioGenerator;
use serde::{Deserialize, Serialize};
use services::ProfileStore;
use std::sync::Arc;
use store::{JsonFileProfileStore, SqliteProfileStore, StoreBackend};
use twin::{Category, DigitalTwinProfile};
use uuid::Uuid;
use weaviate::WeaviateClient;

// ============ Action Results ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Persisted profile replaced the in-memory one
    Loaded,
    /// Nothing persisted yet; in-memory profile left as it was
    NotFound,
    /// Persisted profile was unreadable; defaults are in effect
    Reset { warning: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeResult {
    pub model: ProvocationModel,
    pub question: String,
}

// ============ Session ============

/// One interactive coaching session. Owns the digital twin and hands it to
/// the orchestrator by reference; only one action runs at a time.
pub struct CoachSession {
    id: String,
    profile_key: String,
    profile: DigitalTwinProfile,
    store: Box<dyn ProfileStore>,
    orchestrator: ScenarioOrchestrator,
    transcript: Vec<ChatMessage>,
    /// Set while the last read from the store errored; saves are refused
    /// until a read succeeds so the stored profile is not clobbered
    load_failed: bool,
}

impl CoachSession {
    /// Start with a default profile; nothing is read from the store until
    /// `load_progress` is called.
    pub fn new(orchestrator: ScenarioOrchestrator, store: Box<dyn ProfileStore>, profile_key: &str) -> Self {
        let id = Uuid::new_v4().to_string();
        logging::log_session(Some(&id), &format!(
            "Session started (profile={}, policy={})", profile_key, orchestrator.policy()
        ));

        Self {
            id,
            profile_key: profile_key.to_string(),
            profile: DigitalTwinProfile::default(),
            store,
            orchestrator,
            transcript: vec![ChatMessage::system(COACH_PERSONA)],
            load_failed: false,
        }
    }

    /// Wire the HTTP clients and the profile store described by `config`
    pub fn from_config(config: &CoachConfig) -> Result<Self, CoachError> {
        let search = WeaviateClient::new(&config.weaviate_url, config.request_timeout)?;
        let generator = OpenAIClient::new(
            config.require_openai_key()?,
            &config.openai_base_url,
            config.request_timeout,
        )?;

        let orchestrator = ScenarioOrchestrator::new(
            KnowledgeRetriever::new(Arc::new(search), &config.knowledge_collection, config.request_timeout),
            ScenarioGenerator::new(Arc::new(generator), &config.generation_model, config.request_timeout),
        )
        .with_policy(config.selection_policy)
        .with_personalization_rate(config.personalization_rate);

        let store: Box<dyn ProfileStore> = match config.profile_store {
            StoreBackend::Sqlite => Box::new(SqliteProfileStore::open(&config.profile_db_path)?),
            StoreBackend::JsonFile => Box::new(JsonFileProfileStore::new(&config.profile_dir)),
        };
        Ok(Self::new(orchestrator, store, &config.profile_key))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profile(&self) -> &DigitalTwinProfile {
        &self.profile
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    fn record(&mut self, request: String, response: &str) {
        self.transcript.push(ChatMessage::user(request));
        self.transcript.push(ChatMessage::assistant(response));
    }

    fn log_warnings(&self, warnings: &[String]) {
        for warning in warnings {
            logging::log_error(Some(&self.id), warning);
        }
    }

    /// Grounded scenario for a category drawn uniformly from the profile
    pub async fn rag_scenario<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ScenarioOutcome {
        let category = self.profile.sample_category(rng);
        let outcome = self.orchestrator.rag_scenario(category).await;
        self.log_warnings(&outcome.warnings);
        self.record(format!("Generate a scenario (RAG): {}", category), &outcome.text);
        outcome
    }

    pub fn value_challenge<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ChallengeResult {
        let (model, question) = pick_challenge(rng);
        logging::log_session(Some(&self.id), &format!("Value challenge from {}", model));
        self.record("Challenge my values".to_string(), &format!("{}: {}", model, question));
        ChallengeResult { model, question: question.to_string() }
    }

    /// Next learning step under the configured selection policy. Does not
    /// touch the profile; see `introduce_novelty`.
    pub async fn next_learning_step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ScenarioOutcome {
        let outcome = self.orchestrator.next_scenario(&self.profile, rng).await;
        self.log_warnings(&outcome.warnings);
        self.record(
            format!("Generate the next learning step ({})", outcome.route.as_str()),
            &outcome.text,
        );
        outcome
    }

    /// Reinforce `category` and persist the profile right away. On a failed
    /// write the in-memory update is kept and the error returned.
    pub fn introduce_novelty(&mut self, category: Category) -> Result<f64, CoachError> {
        let score = self.profile.reinforce(category);
        logging::log_profile(Some(&self.id), &format!("Reinforced {} -> {}", category, score));
        self.save_progress()?;
        Ok(score)
    }

    /// Reinforce the category of a next-step outcome. Only grounded
    /// scenarios count; the team template says nothing about the category.
    pub fn reinforce_outcome(&mut self, outcome: &ScenarioOutcome) -> Result<Option<f64>, CoachError> {
        match outcome.route {
            ScenarioRoute::Rag => self.introduce_novelty(outcome.category).map(Some),
            ScenarioRoute::TeamDynamics => Ok(None),
        }
    }

    pub fn set_preferred_model(&mut self, model: ProvocationModel) {
        self.profile.set_preferred_model(model);
        logging::log_profile(Some(&self.id), &format!("Preferred model set to {}", model));
    }

    pub fn save_progress(&self) -> Result<(), CoachError> {
        if self.load_failed {
            let message = format!(
                "not saving profile '{}': the stored copy could not be read, load it again first",
                self.profile_key
            );
            logging::log_error(Some(&self.id), &message);
            return Err(CoachError::Store(message));
        }

        let body = self.profile.to_json()?;
        match self.store.save(&self.profile_key, &body) {
            Ok(()) => {
                logging::log_profile(Some(&self.id), &format!("Saved profile '{}'", self.profile_key));
                Ok(())
            }
            Err(e) => {
                logging::log_error(Some(&self.id), &format!("Saving profile '{}' failed: {}", self.profile_key, e));
                Err(e)
            }
        }
    }

    /// Read the persisted profile. A missing entry leaves the current profile
    /// unchanged; an unreadable one resets to defaults with a warning.
    pub fn load_progress(&mut self) -> Result<LoadOutcome, CoachError> {
        let body = match self.store.load(&self.profile_key) {
            Ok(body) => body,
            Err(e) => {
                self.load_failed = true;
                logging::log_error(Some(&self.id), &format!("Loading profile '{}' failed: {}", self.profile_key, e));
                return Err(e);
            }
        };
        self.load_failed = false;

        let Some(body) = body else {
            logging::log_profile(Some(&self.id), &format!("No saved profile '{}' yet", self.profile_key));
            return Ok(LoadOutcome::NotFound);
        };

        match DigitalTwinProfile::from_json(&body) {
            Ok(profile) => {
                self.profile = profile;
                logging::log_profile(Some(&self.id), &format!("Loaded profile '{}'", self.profile_key));
                Ok(LoadOutcome::Loaded)
            }
            Err(e) => {
                self.profile = DigitalTwinProfile::default();
                let warning = format!("Saved profile '{}' could not be read, starting fresh: {}", self.profile_key, e);
                logging::log_error(Some(&self.id), &warning);
                Ok(LoadOutcome::Reset { warning })
            }
        }
    }
}
