// Value-challenge provocations - one fixed question per philosophical persona

use crate::error::CoachError;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const BATESON_QUESTION: &str =
    "Explain why your actions are decided unconsciously.";

pub const BERGSON_QUESTION: &str =
    "Reconsider the decision you are making right now in light of creative evolution.";

pub const MARX_QUESTION: &str =
    "Discuss how labor shapes your identity.";

pub const NISHIDA_QUESTION: &str =
    "Consider how the relationship between subject and object could be unified.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProvocationModel {
    #[default]
    Bateson,
    Bergson,
    Marx,
    Nishida,
}

impl ProvocationModel {
    pub const ALL: [ProvocationModel; 4] = [
        ProvocationModel::Bateson,
        ProvocationModel::Bergson,
        ProvocationModel::Marx,
        ProvocationModel::Nishida,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvocationModel::Bateson => "Bateson",
            ProvocationModel::Bergson => "Bergson",
            ProvocationModel::Marx => "Marx",
            ProvocationModel::Nishida => "Nishida",
        }
    }

    /// The fixed provocation question for this persona
    pub fn question(&self) -> &'static str {
        match self {
            ProvocationModel::Bateson => BATESON_QUESTION,
            ProvocationModel::Bergson => BERGSON_QUESTION,
            ProvocationModel::Marx => MARX_QUESTION,
            ProvocationModel::Nishida => NISHIDA_QUESTION,
        }
    }
}

impl fmt::Display for ProvocationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvocationModel {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bateson" => Ok(ProvocationModel::Bateson),
            "bergson" => Ok(ProvocationModel::Bergson),
            "marx" => Ok(ProvocationModel::Marx),
            "nishida" => Ok(ProvocationModel::Nishida),
            _ => Err(CoachError::Config(format!("unknown provocation model '{}'", s))),
        }
    }
}

/// Pick a persona uniformly and pair it with its question
pub fn pick_challenge<R: Rng + ?Sized>(rng: &mut R) -> (ProvocationModel, &'static str) {
    let model = ProvocationModel::ALL
        .choose(rng)
        .copied()
        .unwrap_or_default();
    (model, model.question())
}
