//! Tap state document and its persistence
//!
//! The state document holds one bookmark map per stream plus the stream
//! currently being synced:
//!
//! ```json
//! {"currently_syncing": null, "bookmarks": {"vaccinations": {"state_abbrev_from_date": "SC|2021-02-01"}}}
//! ```
//!
//! Files are written atomically (temp file + rename + fsync) while holding an
//! exclusive `fd-lock` on a sibling `.lock` file, and read under a shared lock.

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Maximum allowed state file size (10 MB) to prevent memory exhaustion
pub const MAX_STATE_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Singer state document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TapState {
    /// Stream being synced when the state was written
    #[serde(default)]
    pub currently_syncing: Option<String>,

    /// Bookmark maps keyed by stream id
    #[serde(default)]
    pub bookmarks: Map<String, Value>,

    /// Top-level keys written by other tools, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TapState {
    /// Parse a state document
    ///
    /// Accepts a bare document or a STATE message wrapping one, as captured
    /// from a previous run's output. Empty input yields an empty state.
    pub fn from_json(contents: &str) -> Result<Self, StateError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let document: Value = serde_json::from_str(contents)
            .map_err(|e| StateError::DeserializationError(e.to_string()))?;

        let document = match document {
            Value::Object(mut message)
                if message.get("type").and_then(Value::as_str) == Some("STATE") =>
            {
                message
                    .remove("value")
                    .unwrap_or_else(|| Value::Object(Map::new()))
            }
            other => other,
        };

        serde_json::from_value(document).map_err(|e| {
            warn!(error = %e, "Failed to deserialize tap state");
            StateError::DeserializationError(e.to_string())
        })
    }

    /// Bookmark value stored under `key` for `stream`
    pub fn get_bookmark(&self, stream: &str, key: &str) -> Option<&str> {
        self.bookmarks.get(stream)?.get(key)?.as_str()
    }

    /// Store a bookmark value, creating the stream's map if needed
    pub fn write_bookmark(&mut self, stream: &str, key: &str, value: impl Into<String>) {
        let entry = self
            .bookmarks
            .entry(stream.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            warn!(stream, "Replacing non-object bookmark entry");
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), Value::String(value.into()));
        }
    }

    /// Set or clear the stream currently being synced
    pub fn set_currently_syncing(&mut self, stream: Option<&str>) {
        self.currently_syncing = stream.map(str::to_string);
    }

    /// Save state to file with atomic writes and file locking
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        debug!(path = %path.display(), "Saving tap state");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StateError::IoError(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StateError::SerializationError(e.to_string()))?;

        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StateError::LockError(format!("Failed to create lock file: {e}")))?;

        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| StateError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let parent_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| StateError::IoError(format!("Failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| StateError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| StateError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| StateError::IoError(format!("Failed to sync temp file: {e}")))?;

        temp_file
            .persist(path)
            .map_err(|e| StateError::IoError(format!("Failed to persist temp file: {e}")))?;

        if let Ok(dir) = std::fs::File::open(parent_dir) {
            let _ = dir.sync_all();
        }

        info!(
            path = %path.display(),
            streams = self.bookmarks.len(),
            "Tap state saved"
        );
        Ok(())
    }

    /// Load state from file with locking
    pub fn load(path: &Path) -> Result<Self, StateError> {
        debug!(path = %path.display(), "Loading tap state");

        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StateError::LockError(format!("Failed to create lock file: {e}")))?;

        let lock = RwLock::new(lock_file);
        let _guard = lock
            .read()
            .map_err(|e| StateError::LockError(format!("Failed to acquire read lock: {e}")))?;

        let metadata = std::fs::metadata(path).map_err(|e| StateError::IoError(e.to_string()))?;
        if metadata.len() > MAX_STATE_FILE_SIZE {
            return Err(StateError::StateTooLarge {
                size: metadata.len(),
                max: MAX_STATE_FILE_SIZE,
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| StateError::IoError(e.to_string()))?;
        let state = Self::from_json(&contents)?;

        info!(
            path = %path.display(),
            streams = state.bookmarks.len(),
            "Tap state loaded"
        );
        Ok(state)
    }
}

/// Errors related to tap state
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// State file too large
    #[error("state file too large: {size} bytes (max: {max} bytes)")]
    StateTooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}
