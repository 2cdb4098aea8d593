use crate::error::{HumidityError, Result};
use crate::{io, paths};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// PersistedState
// ---------------------------------------------------------------------------

/// What the previous run left behind. Both fields are absent before the
/// first successful run; absence is never encoded as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_recommendation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
}

impl PersistedState {
    pub fn new(recommendation: i32, ran_at: DateTime<Utc>) -> Self {
        Self {
            last_recommendation: Some(recommendation),
            last_run: Some(ran_at),
        }
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// A single JSON state file inside the configured state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Ensure `dir` exists and target `dir/state.json`.
    pub fn open(dir: &Path) -> Result<Self> {
        io::ensure_dir(dir).map_err(|e| {
            HumidityError::State(format!("ensure state dir {}: {e}", dir.display()))
        })?;
        Ok(Self {
            path: paths::state_path(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load persisted state; a missing file is the empty state.
    pub fn load(&self) -> Result<PersistedState> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PersistedState::default())
            }
            Err(e) => {
                return Err(HumidityError::State(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };
        serde_json::from_str(&data).map_err(|e| {
            HumidityError::State(format!("parse {}: {e}", self.path.display()))
        })
    }

    /// Replace the state file atomically; the previous record is never merged.
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let data = serde_json::to_string_pretty(state)?;
        io::atomic_write(&self.path, data.as_bytes()).map_err(|e| {
            HumidityError::State(format!("write {}: {e}", self.path.display()))
        })
    }
}
