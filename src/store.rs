use crate::error::CoachError;
use crate::services::ProfileStore;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Sqlite,
    JsonFile,
}

impl std::str::FromStr for StoreBackend {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "json" | "json_file" => Ok(StoreBackend::JsonFile),
            _ => Err(CoachError::Config(format!("unknown profile store '{}'", s))),
        }
    }
}

// ============ SQLite ============

/// Profile blobs keyed by profile name in a local SQLite database
pub struct SqliteProfileStore {
    conn: Mutex<Connection>,
}

impl SqliteProfileStore {
    pub fn open(path: &Path) -> Result<Self, CoachError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, CoachError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CoachError> {
        conn.execute_batch(
            "
            -- One document per profile key
            CREATE TABLE IF NOT EXISTS twin_profiles (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "
        )?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T, CoachError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn
            .lock()
            .map_err(|_| CoachError::Store("profile database lock poisoned".into()))?;
        Ok(f(&*conn)?)
    }
}

impl ProfileStore for SqliteProfileStore {
    fn load(&self, key: &str) -> Result<Option<String>, CoachError> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT body FROM twin_profiles WHERE key = ?1",
                params![key],
                |row| row.get(0)
            ).optional()
        })
    }

    fn save(&self, key: &str, body: &str) -> Result<(), CoachError> {
        let now = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO twin_profiles (key, body, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![key, body, now]
            )?;
            Ok(())
        })
    }
}

// ============ JSON file ============

/// One `<key>.json` document per profile inside a directory
pub struct JsonFileProfileStore {
    dir: PathBuf,
}

impl JsonFileProfileStore {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CoachError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CoachError::Store(format!("invalid profile key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl ProfileStore for JsonFileProfileStore {
    fn load(&self, key: &str) -> Result<Option<String>, CoachError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Written to a sibling temp file and renamed over the target
    fn save(&self, key: &str, body: &str) -> Result<(), CoachError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
