//! Structured logging module for DX Coach
//!
//! Writes logs to the configured log directory with categories:
//! - RETRIEVAL: Knowledge base lookups
//! - GENERATION: Scenario generation requests
//! - PROFILE: Digital twin changes and persistence
//! - SESSION: Session lifecycle and routing decisions
//! - ERROR: Degraded calls and failures
//!
//! Every line is also emitted as a `tracing` event so the binary's subscriber
//! sees it on the console.

use chrono::{Local, Utc};
use once_cell::sync::Lazy;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Log categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Retrieval,  // Knowledge base lookups
    Generation, // Generation service calls
    Profile,    // Reinforcement, save, load
    Session,    // Session lifecycle and routing
    Error,      // Failures and fallbacks
}

impl LogCategory {
    fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Retrieval => "RETRIEVAL",
            LogCategory::Generation => "GENERATION",
            LogCategory::Profile => "PROFILE",
            LogCategory::Session => "SESSION",
            LogCategory::Error => "ERROR",
        }
    }
}

/// Directory receiving daily log files; `None` until `init_logging` runs
static LOG_DIR: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

fn log_dir() -> Option<PathBuf> {
    LOG_DIR.lock().ok().and_then(|dir| dir.clone())
}

/// Get today's log file path inside `dir`
fn log_file_path(dir: &Path) -> PathBuf {
    let today = Local::now().format("%Y-%m-%d").to_string();
    dir.join(format!("dxcoach-{}.log", today))
}

/// Initialize the file sink - creates the log directory if needed
pub fn init_logging(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    if let Ok(mut current) = LOG_DIR.lock() {
        *current = Some(dir.to_path_buf());
    }

    log(LogCategory::Session, None, "DX Coach logging initialized");
    Ok(())
}

/// Render a single log line
fn format_line(category: LogCategory, session_id: Option<&str>, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let session_context = session_id
        .map(|id| format!("session={} | ", &id[..8.min(id.len())]))
        .unwrap_or_default();

    format!(
        "[{}] [{}] {}{}\n",
        timestamp,
        category.as_str(),
        session_context,
        message
    )
}

/// Log a message with category and optional session context
pub fn log(category: LogCategory, session_id: Option<&str>, message: &str) {
    let session = session_id.unwrap_or("-");
    match category {
        LogCategory::Error => tracing::error!(category = category.as_str(), session, "{}", message),
        _ => tracing::info!(category = category.as_str(), session, "{}", message),
    }

    let Some(dir) = log_dir() else {
        return;
    };

    let line = format_line(category, session_id, message);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(&dir))
    {
        let _ = file.write_all(line.as_bytes());
    }
}

pub fn log_retrieval(session_id: Option<&str>, message: &str) {
    log(LogCategory::Retrieval, session_id, message);
}

pub fn log_generation(session_id: Option<&str>, message: &str) {
    log(LogCategory::Generation, session_id, message);
}

/// Log a profile event (reinforcement, save, load)
pub fn log_profile(session_id: Option<&str>, message: &str) {
    log(LogCategory::Profile, session_id, message);
}

/// Log a session lifecycle or routing event
pub fn log_session(session_id: Option<&str>, message: &str) {
    log(LogCategory::Session, session_id, message);
}

/// Log an error
pub fn log_error(session_id: Option<&str>, message: &str) {
    log(LogCategory::Error, session_id, message);
}

/// Clean up old log files (keep last 7 days)
pub fn cleanup_old_logs() -> std::io::Result<usize> {
    let Some(dir) = log_dir() else {
        return Ok(0);
    };
    cleanup_logs_in(&dir, chrono::Duration::days(7))
}

fn cleanup_logs_in(dir: &Path, keep: chrono::Duration) -> std::io::Result<usize> {
    let mut deleted = 0;

    if !dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - keep;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path.extension().map(|ext| ext == "log").unwrap_or(false);
        if !is_log {
            continue;
        }

        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                let modified_time: chrono::DateTime<Utc> = modified.into();
                if modified_time < cutoff && fs::remove_file(&path).is_ok() {
                    deleted += 1;
                }
            }
        }
    }

    Ok(deleted)
}
