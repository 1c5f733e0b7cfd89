use crate::error::CoachError;
use crate::knowledge::KnowledgeRetriever;
use crate::logging;
use crate::scenario::{team_scenario, ScenarioGenerator};
use crate::twin::{Category, DigitalTwinProfile};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Probability that the personalized policies take the RAG path
pub const DEFAULT_PERSONALIZATION_RATE: f64 = 0.7;

// ============ Selection Policy ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Any category with equal probability, always grounded generation
    Uniform,
    /// Uniform over the profile's categories (scores do not weigh in), then a
    /// coin flip between grounded generation and the team template
    #[default]
    Personalized,
    /// Alternative to `Personalized` that draws categories in proportion to
    /// `score + 1`
    PreferenceWeighted,
}

impl SelectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionPolicy::Uniform => "uniform",
            SelectionPolicy::Personalized => "personalized",
            SelectionPolicy::PreferenceWeighted => "weighted",
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionPolicy {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uniform" => Ok(SelectionPolicy::Uniform),
            "personalized" => Ok(SelectionPolicy::Personalized),
            "weighted" | "preference_weighted" => Ok(SelectionPolicy::PreferenceWeighted),
            _ => Err(CoachError::Config(format!("unknown selection policy '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioRoute {
    Rag,
    TeamDynamics,
}

impl ScenarioRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioRoute::Rag => "rag",
            ScenarioRoute::TeamDynamics => "team_dynamics",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutcome {
    pub category: Category,
    pub route: ScenarioRoute,
    pub text: String,
    /// User-visible warnings from degraded collaborator calls
    pub warnings: Vec<String>,
}

// ============ Orchestrator ============

pub struct ScenarioOrchestrator {
    retriever: KnowledgeRetriever,
    generator: ScenarioGenerator,
    policy: SelectionPolicy,
    personalization_rate: f64,
}

impl ScenarioOrchestrator {
    pub fn new(retriever: KnowledgeRetriever, generator: ScenarioGenerator) -> Self {
        Self {
            retriever,
            generator,
            policy: SelectionPolicy::default(),
            personalization_rate: DEFAULT_PERSONALIZATION_RATE,
        }
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Clamped into [0, 1]
    pub fn with_personalization_rate(mut self, rate: f64) -> Self {
        self.personalization_rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { DEFAULT_PERSONALIZATION_RATE };
        self
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn choose_category<R: Rng + ?Sized>(&self, profile: &DigitalTwinProfile, rng: &mut R) -> Category {
        match self.policy {
            SelectionPolicy::Uniform => Category::random(rng),
            SelectionPolicy::Personalized => profile.sample_category(rng),
            SelectionPolicy::PreferenceWeighted => profile.sample_category_weighted(rng),
        }
    }

    pub fn choose_route<R: Rng + ?Sized>(&self, rng: &mut R) -> ScenarioRoute {
        match self.policy {
            SelectionPolicy::Uniform => ScenarioRoute::Rag,
            SelectionPolicy::Personalized | SelectionPolicy::PreferenceWeighted => {
                if rng.random_bool(self.personalization_rate) {
                    ScenarioRoute::Rag
                } else {
                    ScenarioRoute::TeamDynamics
                }
            }
        }
    }

    /// Next learning step for this profile. The profile is only read; callers
    /// decide separately whether to reinforce the returned category.
    pub async fn next_scenario<R: Rng + ?Sized>(
        &self,
        profile: &DigitalTwinProfile,
        rng: &mut R,
    ) -> ScenarioOutcome {
        let category = self.choose_category(profile, rng);
        let route = self.choose_route(rng);

        logging::log_session(None, &format!(
            "Next step: policy={}, category={}, route={}",
            self.policy, category, route.as_str()
        ));

        match route {
            ScenarioRoute::Rag => self.rag_scenario(category).await,
            ScenarioRoute::TeamDynamics => ScenarioOutcome {
                category,
                route,
                text: team_scenario().to_string(),
                warnings: Vec::new(),
            },
        }
    }

    /// Retrieval-grounded scenario for a fixed category
    pub async fn rag_scenario(&self, category: Category) -> ScenarioOutcome {
        let topic = category.as_str();
        let snippet = self.retriever.retrieve(topic).await;
        let generated = self.generator.generate(topic, &snippet).await;

        let warnings = snippet
            .warning()
            .into_iter()
            .chain(generated.warning())
            .collect();

        ScenarioOutcome {
            category,
            route: ScenarioRoute::Rag,
            text: generated.into_text(),
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{GENERATION_FAILED_TEXT, TEAM_DYNAMICS_SCENARIO};
    use crate::testing::{FixedRng, StubGenerator, StubSearch};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;
    use std::time::Duration;

    fn orchestrator(search: StubSearch, generator: StubGenerator) -> (Arc<StubSearch>, Arc<StubGenerator>, ScenarioOrchestrator) {
        let search = Arc::new(search);
        let generator = Arc::new(generator);
        let orchestrator = ScenarioOrchestrator::new(
            KnowledgeRetriever::new(search.clone(), "Philosophy", Duration::from_millis(200)),
            ScenarioGenerator::new(generator.clone(), "gpt-4", Duration::from_millis(200)),
        );
        (search, generator, orchestrator)
    }

    #[tokio::test]
    async fn test_low_draw_takes_rag_path() {
        let (search, generator, orchestrator) = orchestrator(
            StubSearch::with_matches(&["Cybernetics of self"]),
            StubGenerator::replying("Grounded scenario"),
        );
        let profile = DigitalTwinProfile::default();

        let outcome = orchestrator.next_scenario(&profile, &mut FixedRng(0)).await;

        assert_eq!(outcome.route, ScenarioRoute::Rag);
        assert_eq!(outcome.text, "Grounded scenario");
        assert!(outcome.warnings.is_empty());
        assert_eq!(search.queries()[0].1, outcome.category.as_str());
        assert_eq!(generator.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_high_draw_takes_team_template() {
        let (search, generator, orchestrator) = orchestrator(
            StubSearch::with_matches(&["unused"]),
            StubGenerator::replying("unused"),
        );
        let profile = DigitalTwinProfile::default();

        let outcome = orchestrator.next_scenario(&profile, &mut FixedRng(u64::MAX)).await;

        assert_eq!(outcome.route, ScenarioRoute::TeamDynamics);
        assert_eq!(outcome.text, TEAM_DYNAMICS_SCENARIO);
        assert!(search.queries().is_empty());
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_uniform_policy_always_generates() {
        let (_, _, orchestrator) = orchestrator(
            StubSearch::with_matches(&[]),
            StubGenerator::replying("Plain scenario"),
        );
        let orchestrator = orchestrator.with_policy(SelectionPolicy::Uniform);
        let profile = DigitalTwinProfile::default();

        let outcome = orchestrator.next_scenario(&profile, &mut FixedRng(u64::MAX)).await;
        assert_eq!(outcome.route, ScenarioRoute::Rag);
        assert_eq!(outcome.text, "Plain scenario");
    }

    #[tokio::test]
    async fn test_failures_still_produce_text() {
        let (_, _, orchestrator) = orchestrator(
            StubSearch::failing("weaviate down"),
            StubGenerator::failing("openai down"),
        );

        let outcome = orchestrator.rag_scenario(Category::DataAnalysis).await;

        assert_eq!(outcome.text, GENERATION_FAILED_TEXT);
        assert!(!outcome.text.is_empty());
        assert_eq!(outcome.warnings.len(), 2);
        assert!(outcome.warnings[0].contains("weaviate down"));
        assert!(outcome.warnings[1].contains("openai down"));
    }

    #[tokio::test]
    async fn test_not_found_snippet_still_generates() {
        let (_, generator, orchestrator) = orchestrator(
            StubSearch::with_matches(&[]),
            StubGenerator::replying("Scenario without grounding"),
        );

        let outcome = orchestrator.rag_scenario(Category::DataAnalysis).await;

        assert_eq!(outcome.text, "Scenario without grounding");
        assert!(outcome.warnings.is_empty());
        let requests = generator.requests();
        assert!(requests[0].1[0].content.contains(crate::knowledge::NOT_FOUND_TEXT));
    }

    #[test]
    fn test_route_split_roughly_matches_rate() {
        let (_, _, orchestrator) = orchestrator(StubSearch::with_matches(&[]), StubGenerator::replying("x"));
        let mut rng = StdRng::seed_from_u64(2024);
        let rag = (0..2000)
            .filter(|_| orchestrator.choose_route(&mut rng) == ScenarioRoute::Rag)
            .count();
        assert!((1250..1550).contains(&rag), "rag route taken {} times", rag);
    }

    #[test]
    fn test_rate_extremes() {
        let (_, _, orchestrator) = orchestrator(StubSearch::with_matches(&[]), StubGenerator::replying("x"));
        let always = orchestrator.with_personalization_rate(3.0);
        let mut rng = StdRng::seed_from_u64(5);
        assert!((0..100).all(|_| always.choose_route(&mut rng) == ScenarioRoute::Rag));

        let never = always.with_personalization_rate(0.0);
        assert!((0..100).all(|_| never.choose_route(&mut rng) == ScenarioRoute::TeamDynamics));
    }

    fn heavily_reinforced(category: Category) -> DigitalTwinProfile {
        let mut profile = DigitalTwinProfile::default();
        for _ in 0..40 {
            profile.reinforce(category);
        }
        profile
    }

    #[test]
    fn test_personalized_policy_ignores_score_sizes() {
        let (_, _, orchestrator) = orchestrator(StubSearch::with_matches(&[]), StubGenerator::replying("x"));
        let orchestrator = orchestrator.with_policy(SelectionPolicy::Personalized);
        let profile = heavily_reinforced(Category::EthicalThinking);
        let mut rng = StdRng::seed_from_u64(77);

        let hits = (0..6000)
            .filter(|_| orchestrator.choose_category(&profile, &mut rng) == Category::EthicalThinking)
            .count();
        // 1/6 of 6000 is 1000
        assert!((850..1150).contains(&hits), "ethical-thinking drawn {} times", hits);
    }

    #[test]
    fn test_weighted_policy_follows_scores() {
        let (_, _, orchestrator) = orchestrator(StubSearch::with_matches(&[]), StubGenerator::replying("x"));
        let orchestrator = orchestrator.with_policy(SelectionPolicy::PreferenceWeighted);
        let profile = heavily_reinforced(Category::EthicalThinking);
        let mut rng = StdRng::seed_from_u64(77);

        let hits = (0..6000)
            .filter(|_| orchestrator.choose_category(&profile, &mut rng) == Category::EthicalThinking)
            .count();
        // Weight 21.5 against 1.0 for each of the other five
        assert!(hits > 4300, "ethical-thinking drawn {} times", hits);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("uniform".parse::<SelectionPolicy>().unwrap(), SelectionPolicy::Uniform);
        assert_eq!("Weighted".parse::<SelectionPolicy>().unwrap(), SelectionPolicy::PreferenceWeighted);
        assert!("random".parse::<SelectionPolicy>().is_err());
    }
}
