//! Digital twin profile
//!
//! The twin is the only persistent state of a coaching session: one preference
//! score per topic category plus the preferred provocation model. Scores never
//! decrease; the first exposure to a category is worth a full point, every
//! later exposure adds half a point.

use crate::error::CoachError;
use crate::provocations::ProvocationModel;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Bonus granted the first time a category is reinforced
pub const FIRST_EXPOSURE_SCORE: f64 = 1.0;
/// Fixed increment for every repeat exposure
pub const REPEAT_EXPOSURE_INCREMENT: f64 = 0.5;

// ============ Category ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    AbstractThinking,
    SystemsThinking,
    DataAnalysis,
    ProjectManagement,
    MetaCognition,
    EthicalThinking,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::AbstractThinking,
        Category::SystemsThinking,
        Category::DataAnalysis,
        Category::ProjectManagement,
        Category::MetaCognition,
        Category::EthicalThinking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AbstractThinking => "abstract-thinking",
            Category::SystemsThinking => "systems-thinking",
            Category::DataAnalysis => "data-analysis",
            Category::ProjectManagement => "project-management",
            Category::MetaCognition => "meta-cognition",
            Category::EthicalThinking => "ethical-thinking",
        }
    }

    /// Pick a category uniformly from the fixed set
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Category {
        *Category::ALL
            .choose(rng)
            .unwrap_or(&Category::AbstractThinking)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['_', ' '], "-");
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| CoachError::Config(format!("unknown category '{}'", s)))
    }
}

// ============ Profile ============

/// Wire shape of the persisted blob. Keys are kept as plain strings so that a
/// blob written by another version (extra or missing categories) still loads.
#[derive(Debug, Serialize, Deserialize)]
struct StoredProfile {
    learning_preferences: BTreeMap<String, f64>,
    #[serde(default)]
    preferred_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DigitalTwinProfile {
    preference_scores: BTreeMap<Category, f64>,
    preferred_model: ProvocationModel,
}

impl Default for DigitalTwinProfile {
    fn default() -> Self {
        Self {
            preference_scores: Category::ALL.iter().map(|c| (*c, 0.0)).collect(),
            preferred_model: ProvocationModel::default(),
        }
    }
}

impl DigitalTwinProfile {
    pub fn score(&self, category: Category) -> f64 {
        self.preference_scores.get(&category).copied().unwrap_or(0.0)
    }

    pub fn preference_scores(&self) -> &BTreeMap<Category, f64> {
        &self.preference_scores
    }

    pub fn preferred_model(&self) -> ProvocationModel {
        self.preferred_model
    }

    pub fn set_preferred_model(&mut self, model: ProvocationModel) {
        self.preferred_model = model;
    }

    /// Novelty-introduction update. Returns the new score.
    pub fn reinforce(&mut self, category: Category) -> f64 {
        let score = self.preference_scores.entry(category).or_insert(0.0);
        if *score == 0.0 {
            *score = FIRST_EXPOSURE_SCORE;
        } else {
            *score += REPEAT_EXPOSURE_INCREMENT;
        }
        *score
    }

    /// Category with the highest score, ties broken by category order
    pub fn strongest_category(&self) -> Option<Category> {
        self.preference_scores
            .iter()
            .filter(|(_, score)| **score > 0.0)
            .fold(None, |best: Option<(Category, f64)>, (c, s)| match best {
                Some((_, best_score)) if best_score >= *s => best,
                _ => Some((*c, *s)),
            })
            .map(|(c, _)| c)
    }

    /// Uniform draw over the profile's keys.
    ///
    /// This is the personalized policy as it behaves in practice: score
    /// magnitudes do not influence the draw.
    pub fn sample_category<R: Rng + ?Sized>(&self, rng: &mut R) -> Category {
        let keys: Vec<Category> = self.preference_scores.keys().copied().collect();
        keys.choose(rng).copied().unwrap_or_else(|| Category::random(rng))
    }

    /// Draw weighted by `score + 1`, so unexplored categories stay reachable
    /// while reinforced ones come up more often.
    pub fn sample_category_weighted<R: Rng + ?Sized>(&self, rng: &mut R) -> Category {
        let entries: Vec<(Category, f64)> = self
            .preference_scores
            .iter()
            .map(|(c, s)| (*c, *s))
            .collect();
        match entries.choose_weighted(rng, |&(_, score)| score + 1.0) {
            Ok((category, _)) => *category,
            Err(_) => self.sample_category(rng),
        }
    }

    /// Serialize as the flat `{learning_preferences, preferred_model}` record
    pub fn to_json(&self) -> Result<String, CoachError> {
        let stored = StoredProfile {
            learning_preferences: self
                .preference_scores
                .iter()
                .map(|(c, s)| (c.as_str().to_string(), *s))
                .collect(),
            preferred_model: Some(self.preferred_model.as_str().to_string()),
        };
        Ok(serde_json::to_string(&stored)?)
    }

    /// Parse a persisted blob, normalizing it so every known category has
    /// exactly one non-negative score. Unknown categories are dropped and an
    /// unknown preferred model falls back to the default.
    pub fn from_json(body: &str) -> Result<Self, CoachError> {
        let stored: StoredProfile =
            serde_json::from_str(body).map_err(|e| CoachError::ProfileFormat(e.to_string()))?;

        let mut profile = DigitalTwinProfile::default();
        for (key, score) in stored.learning_preferences {
            let Ok(category) = key.parse::<Category>() else {
                continue;
            };
            let score = if score.is_finite() && score > 0.0 { score } else { 0.0 };
            profile.preference_scores.insert(category, score);
        }

        if let Some(model) = stored.preferred_model.and_then(|m| m.parse().ok()) {
            profile.preferred_model = model;
        }

        Ok(profile)
    }
}
