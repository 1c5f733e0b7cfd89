//! Error types shared by the coach core and its service clients.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoachError {
    /// Knowledge search failed or returned something unusable
    #[error("knowledge search failed: {0}")]
    Retrieval(String),

    /// Text generation failed or returned nothing
    #[error("scenario generation failed: {0}")]
    Generation(String),

    #[error("{service} did not respond within {after:?}")]
    Timeout { service: String, after: Duration },

    #[error("http error: {0}")]
    Http(String),

    /// Durable profile store could not be read or written
    #[error("profile store error: {0}")]
    Store(String),

    /// Persisted profile exists but cannot be parsed
    #[error("stored profile is unreadable: {0}")]
    ProfileFormat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for CoachError {
    fn from(e: std::io::Error) -> Self {
        CoachError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CoachError {
    fn from(e: serde_json::Error) -> Self {
        CoachError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoachError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CoachError::Timeout {
                service: e
                    .url()
                    .map(|u| u.host_str().unwrap_or("remote service").to_string())
                    .unwrap_or_else(|| "remote service".to_string()),
                after: Duration::ZERO,
            }
        } else {
            CoachError::Http(e.to_string())
        }
    }
}

impl From<rusqlite::Error> for CoachError {
    fn from(e: rusqlite::Error) -> Self {
        CoachError::Store(e.to_string())
    }
}
