//! Runtime configuration, read from the environment (and `.env` when present).

use crate::error::CoachError;
use crate::openai::{DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL};
use crate::orchestrator::{SelectionPolicy, DEFAULT_PERSONALIZATION_RATE};
use crate::store::StoreBackend;
use crate::weaviate::{DEFAULT_COLLECTION, DEFAULT_WEAVIATE_URL};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_PROFILE_KEY: &str = "default";

#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub weaviate_url: String,
    pub knowledge_collection: String,
    pub generation_model: String,
    pub request_timeout: Duration,
    pub profile_store: StoreBackend,
    pub profile_db_path: PathBuf,
    pub profile_dir: PathBuf,
    pub profile_key: String,
    pub log_dir: PathBuf,
    pub selection_policy: SelectionPolicy,
    pub personalization_rate: f64,
}

impl CoachConfig {
    pub fn from_env() -> Result<Self, CoachError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoachError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
        let data_dir = PathBuf::from(home).join(".dxcoach");

        let request_timeout = match get("DXCOACH_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    CoachError::Config(format!("DXCOACH_TIMEOUT_SECS must be a whole number of seconds, got '{}'", raw))
                })?;
                if secs == 0 {
                    return Err(CoachError::Config("DXCOACH_TIMEOUT_SECS must be greater than zero".into()));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let selection_policy = match get("DXCOACH_POLICY") {
            Some(raw) => raw.parse()?,
            None => SelectionPolicy::default(),
        };

        let personalization_rate = match get("DXCOACH_PERSONALIZATION_RATE") {
            Some(raw) => {
                let rate: f64 = raw.parse().map_err(|_| {
                    CoachError::Config(format!("DXCOACH_PERSONALIZATION_RATE must be a number, got '{}'", raw))
                })?;
                if !(0.0..=1.0).contains(&rate) {
                    return Err(CoachError::Config(format!(
                        "DXCOACH_PERSONALIZATION_RATE must be within [0, 1], got {}", rate
                    )));
                }
                rate
            }
            None => DEFAULT_PERSONALIZATION_RATE,
        };

        let profile_store = match get("DXCOACH_STORE") {
            Some(raw) => raw.parse()?,
            None => StoreBackend::default(),
        };

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            weaviate_url: get("WEAVIATE_URL").unwrap_or_else(|| DEFAULT_WEAVIATE_URL.to_string()),
            knowledge_collection: get("DXCOACH_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            generation_model: get("DXCOACH_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout,
            profile_store,
            profile_db_path: get("DXCOACH_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("digital_twin.db")),
            profile_dir: get("DXCOACH_PROFILE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("profiles")),
            profile_key: get("DXCOACH_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE_KEY.to_string()),
            log_dir: get("DXCOACH_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("logs")),
            selection_policy,
            personalization_rate,
        })
    }

    pub fn require_openai_key(&self) -> Result<&str, CoachError> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| CoachError::Config("OPENAI_API_KEY is not set".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<CoachConfig, CoachError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CoachConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("HOME", "/home/coach")]).unwrap();
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.weaviate_url, "http://localhost:8080");
        assert_eq!(config.knowledge_collection, "Philosophy");
        assert_eq!(config.generation_model, "gpt-4");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.profile_store, StoreBackend::Sqlite);
        assert_eq!(config.profile_db_path, PathBuf::from("/home/coach/.dxcoach/digital_twin.db"));
        assert_eq!(config.profile_dir, PathBuf::from("/home/coach/.dxcoach/profiles"));
        assert_eq!(config.log_dir, PathBuf::from("/home/coach/.dxcoach/logs"));
        assert_eq!(config.profile_key, "default");
        assert_eq!(config.selection_policy, SelectionPolicy::Personalized);
        assert_eq!(config.personalization_rate, 0.7);
        assert!(config.require_openai_key().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DXCOACH_TIMEOUT_SECS", "15"),
            ("DXCOACH_POLICY", "weighted"),
            ("DXCOACH_PERSONALIZATION_RATE", "0.5"),
            ("DXCOACH_PROFILE", "alice"),
            ("DXCOACH_STORE", "json"),
            ("DXCOACH_MODEL", " "),
        ]).unwrap();
        assert_eq!(config.require_openai_key().unwrap(), "sk-test");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.selection_policy, SelectionPolicy::PreferenceWeighted);
        assert_eq!(config.personalization_rate, 0.5);
        assert_eq!(config.profile_key, "alice");
        assert_eq!(config.profile_store, StoreBackend::JsonFile);
        // Blank counts as unset
        assert_eq!(config.generation_model, "gpt-4");
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("DXCOACH_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config_from(&[("DXCOACH_TIMEOUT_SECS", "0")]).is_err());
        assert!(config_from(&[("DXCOACH_PERSONALIZATION_RATE", "1.5")]).is_err());
        assert!(config_from(&[("DXCOACH_POLICY", "random")]).is_err());
        assert!(config_from(&[("DXCOACH_STORE", "redis")]).is_err());
    }
}
