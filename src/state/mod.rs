//! Persisted per-niche cursors
//!
//! Each niche owns one JSON state record holding the generation cursor and
//! one [`PlatformCursor`] per upload platform. The record is always read,
//! modified and written back as a whole.
//!
//! # Example
//!
//! ```no_run
//! use nichecast::state::StateStore;
//!
//! # fn example() -> Result<(), nichecast::state::StateError> {
//! let store = StateStore::new("./niches/Cats/state.json");
//! let _guard = store.lock()?;
//!
//! let mut state = store.load()?;
//! state.advance_generation();
//! store.save(&state)?;
//! # Ok(())
//! # }
//! ```

mod legacy;
mod lock;

pub use lock::{NicheLock, LOCK_FILE_NAME};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while reading or writing niche state
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to {operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("State file {} is not valid: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Niche is locked by another run ({}{})", path.display(), holder.map(|pid| format!(", pid {pid}")).unwrap_or_default())]
    Locked { path: PathBuf, holder: Option<u32> },

    #[error("Published number would move backwards from {from} to {to}")]
    Regression { from: u32, to: u32 },

    #[error("Schedule time would move backwards from {from} to {to}")]
    ScheduleRegression {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },
}

impl StateError {
    pub(crate) fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

// ============================================================================
// State Types
// ============================================================================

/// Upload progress of one platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCursor {
    /// Number of the last artifact confirmed as uploaded
    #[serde(default)]
    pub last_published_number: Option<u32>,

    /// Canonical slot time of the last schedule
    #[serde(default)]
    pub last_schedule_time: Option<NaiveDateTime>,
}

impl PlatformCursor {
    /// Check if this platform never published anything
    pub fn is_unset(&self) -> bool {
        self.last_published_number.is_none() && self.last_schedule_time.is_none()
    }

    /// Record a confirmed publication
    ///
    /// Refuses to move either field backwards; the cursor is untouched on
    /// error.
    pub fn advance(&mut self, number: u32, canonical: NaiveDateTime) -> Result<(), StateError> {
        if let Some(last) = self.last_published_number {
            if number <= last {
                return Err(StateError::Regression {
                    from: last,
                    to: number,
                });
            }
        }
        if let Some(last) = self.last_schedule_time {
            if canonical < last {
                return Err(StateError::ScheduleRegression {
                    from: last,
                    to: canonical,
                });
            }
        }

        self.last_published_number = Some(number);
        self.last_schedule_time = Some(canonical);
        Ok(())
    }

    /// Format as display string
    pub fn display(&self) -> String {
        let number = self
            .last_published_number
            .map(|n| format!("#{n}"))
            .unwrap_or_else(|| "none".to_string());
        let time = self
            .last_schedule_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        format!("last published {number}, scheduled {time}")
    }
}

fn default_generation_cursor() -> u32 {
    1
}

/// The persisted record of one niche
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicheState {
    /// Part label of the next artifact to generate
    #[serde(default = "default_generation_cursor")]
    pub generation_cursor: u32,

    /// Upload progress keyed by platform id
    #[serde(default)]
    pub platform_cursors: BTreeMap<String, PlatformCursor>,
}

impl Default for NicheState {
    fn default() -> Self {
        Self {
            generation_cursor: default_generation_cursor(),
            platform_cursors: BTreeMap::new(),
        }
    }
}

impl NicheState {
    /// Cursor of `platform`, or an unset cursor
    pub fn cursor(&self, platform: &str) -> PlatformCursor {
        self.platform_cursors
            .get(platform)
            .cloned()
            .unwrap_or_default()
    }

    /// Mutable cursor of `platform`, inserting an unset one if needed
    pub fn cursor_mut(&mut self, platform: &str) -> &mut PlatformCursor {
        self.platform_cursors.entry(platform.to_string()).or_default()
    }

    /// Step the generation cursor after a successful render
    pub fn advance_generation(&mut self) {
        self.generation_cursor = self.generation_cursor.saturating_add(1);
    }

    /// Raise the generation cursor to at least `next`
    ///
    /// Returns `true` if the cursor moved.
    pub fn ensure_generation_at_least(&mut self, next: u32) -> bool {
        if self.generation_cursor < next {
            self.generation_cursor = next;
            true
        } else {
            false
        }
    }

    /// Advance the cursor of `platform` after a confirmed upload
    pub fn record_publication(
        &mut self,
        platform: &str,
        number: u32,
        canonical: NaiveDateTime,
    ) -> Result<(), StateError> {
        self.cursor_mut(platform).advance(number, canonical)
    }

    fn normalize(mut self) -> Self {
        if self.generation_cursor == 0 {
            self.generation_cursor = 1;
        }
        self
    }
}

// ============================================================================
// State Store
// ============================================================================

/// Reads and writes the state record of one niche
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    legacy_path: Option<PathBuf>,
}

impl StateStore {
    /// Create a store for the given state file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            legacy_path: None,
        }
    }

    /// Migrate from a legacy upload log when the state file is missing
    pub fn with_legacy(mut self, legacy_path: impl Into<PathBuf>) -> Self {
        self.legacy_path = Some(legacy_path.into());
        self
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state record
    ///
    /// A missing file yields the default record (or a migrated legacy log).
    pub fn load(&self) -> Result<NicheState, StateError> {
        if !self.path.exists() {
            if let Some(legacy) = self.legacy_path.as_deref().filter(|p| p.exists()) {
                let state = legacy::migrate(legacy)?;
                tracing::info!(
                    path = %legacy.display(),
                    generation_cursor = state.generation_cursor,
                    "Migrated legacy upload log"
                );
                return Ok(state.normalize());
            }
            tracing::debug!(path = %self.path.display(), "No state file, using defaults");
            return Ok(NicheState::default());
        }

        let file = File::open(&self.path).map_err(|e| StateError::io("open", &self.path, e))?;
        let reader = BufReader::new(file);
        let state: NicheState =
            serde_json::from_reader(reader).map_err(|source| StateError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), "State loaded");
        Ok(state.normalize())
    }

    /// Overwrite the state record atomically
    pub fn save(&self, state: &NicheState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StateError::io("create", parent, e))?;
        }

        // Write to temp file first, then rename (atomic)
        let temp_path = self.temp_path();
        let file =
            File::create(&temp_path).map_err(|e| StateError::io("create", &temp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, state).map_err(|source| {
            StateError::Corrupt {
                path: temp_path.clone(),
                source,
            }
        })?;
        writer
            .flush()
            .map_err(|e| StateError::io("write", &temp_path, e))?;
        drop(writer);

        fs::rename(&temp_path, &self.path).map_err(|e| StateError::io("rename", &self.path, e))?;

        tracing::debug!(path = %self.path.display(), "State saved");
        Ok(())
    }

    /// Take the per-niche lock next to the state file
    pub fn lock(&self) -> Result<NicheLock, StateError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        NicheLock::acquire(dir.join(LOCK_FILE_NAME))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// ============================================================================
// Tests
// ============================================================================
