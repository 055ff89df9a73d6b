//! Device-local snapshot store: a synchronous key-value interface plus the
//! serialized draft shape written into it.
//!
//! The store is a convenience cache, never a source of truth. Write failures
//! are reported so the coordinator can log them, but the coordinator always
//! swallows them.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::draft::{Draft, StepData};

/// Key for the wizard's auto-save snapshot.
pub const WIZARD_DRAFT_KEY: &str = "resume_wizard_draft";

/// Key for the independent local-only draft surfaced as a "continue editing"
/// offer by the résumé-creation entry point.
pub const LOCAL_DRAFT_KEY: &str = "resume_local_draft";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Synchronous get/set/remove keyed by a fixed name, scoped to one device.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), SnapshotError>;
    fn remove(&self, key: &str);
}

/// What actually gets snapshotted. Dirty flag and save time are session
/// bookkeeping and stay out of the persisted shape; a restored draft starts
/// clean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub current_step: u32,
    pub step_data: StepData,
    pub completed_steps: BTreeSet<u32>,
}

impl From<&Draft> for DraftSnapshot {
    fn from(draft: &Draft) -> Self {
        Self {
            current_step: draft.current_step,
            step_data: draft.step_data.clone(),
            completed_steps: draft.completed_steps.clone(),
        }
    }
}

impl DraftSnapshot {
    pub fn into_draft(self) -> Draft {
        Draft {
            current_step: self.current_step.max(1),
            step_data: self.step_data,
            completed_steps: self.completed_steps,
            is_dirty: false,
            last_saved: None,
        }
    }
}

/// In-memory store used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SnapshotError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

/// One JSON file per key under a directory. Missing or unreadable files read
/// as absent.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Some(contents),
            Err(e) => {
                debug!("snapshot read miss for '{key}': {e}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }
}
