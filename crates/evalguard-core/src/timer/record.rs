//! Durable countdown record.
//!
//! The start time is stored as an absolute timestamp so a countdown resumed
//! after a reload recomputes from the wall clock instead of accumulating drift.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StoreError};
use crate::storage::data_dir;

/// File name of the persisted record inside the data directory.
pub const TIMER_RECORD_FILE: &str = "evaluation_timer.json";

/// Countdown state for one evaluation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(rename = "timeLimitSeconds")]
    pub time_limit_secs: u64,
}

impl TimerRecord {
    /// Whole seconds elapsed since `start_time`; a future start counts as zero.
    pub fn elapsed_secs_at(&self, now: DateTime<Utc>) -> u64 {
        let elapsed_ms = (now - self.start_time).num_milliseconds().max(0);
        (elapsed_ms / 1000) as u64
    }

    /// `max(0, limit - elapsed)`, floored to whole seconds.
    pub fn remaining_secs_at(&self, now: DateTime<Utc>) -> u64 {
        self.time_limit_secs
            .saturating_sub(self.elapsed_secs_at(now))
    }
}

/// Durable storage for a single [`TimerRecord`].
pub trait TimerStore: Send + Sync + 'static {
    /// `Ok(None)` when nothing is stored.
    fn load(&self) -> Result<Option<TimerRecord>, StoreError>;
    fn save(&self, record: &TimerRecord) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// JSON file in the data directory.
#[derive(Debug, Clone)]
pub struct FileTimerStore {
    path: PathBuf,
}

impl FileTimerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.config/evalguard/evaluation_timer.json`.
    pub fn open_default() -> Result<Self, ConfigError> {
        Ok(Self::new(data_dir()?.join(TIMER_RECORD_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TimerStore for FileTimerStore {
    fn load(&self) -> Result<Option<TimerRecord>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    /// Writes a sibling temp file and renames it over the record, so an
    /// interrupted save leaves the previous record intact.
    fn save(&self, record: &TimerRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let staging = self.staging_path();
        std::fs::write(&staging, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&staging, &self.path).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-memory store holding the raw JSON, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryTimerStore {
    raw: Arc<Mutex<Option<String>>>,
}

impl MemoryTimerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store arbitrary text, e.g. to simulate a corrupted record.
    pub fn put_raw(&self, raw: impl Into<String>) {
        *self.raw.lock().unwrap_or_else(|e| e.into_inner()) = Some(raw.into());
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl TimerStore for MemoryTimerStore {
    fn load(&self) -> Result<Option<TimerRecord>, StoreError> {
        match self.raw() {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Malformed(e.to_string())),
        }
    }

    fn save(&self, record: &TimerRecord) -> Result<(), StoreError> {
        self.put_raw(serde_json::to_string(record)?);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.raw.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
