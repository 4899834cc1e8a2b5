//! Persistent record of feed items that have already been posted
//!
//! One JSON file per account, `<cache_dir>/<account>.cache`, shaped as
//! `{"GUIDs": {"<item id>": true}}`. A missing file is an empty record.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, StorageError};

/// Item identifiers that must never be posted again.
///
/// Identifiers are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupRecord {
    #[serde(rename = "GUIDs", default)]
    guids: BTreeMap<String, bool>,
}

impl DedupRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.guids.contains_key(id)
    }

    pub fn mark_seen(&mut self, id: impl Into<String>) {
        self.guids.insert(id.into(), true);
    }

    pub fn len(&self) -> usize {
        self.guids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guids.is_empty()
    }
}

/// File-backed store of one [`DedupRecord`] per account key
#[derive(Debug, Clone)]
pub struct DedupStore {
    dir: PathBuf,
}

impl DedupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for an account key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.cache", key))
    }

    /// Load the record for `key`; no prior state yields an empty record
    pub fn load(&self, key: &str) -> Result<DedupRecord> {
        let path = self.path_for(key);
        debug!("Loading cache {}", path.display());

        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache at {}, starting empty", path.display());
                return Ok(DedupRecord::new());
            }
            Err(e) => {
                return Err(StorageError::Read {
                    path,
                    reason: e.to_string(),
                }
                .into())
            }
        };

        let record: DedupRecord =
            serde_json::from_slice(&content).map_err(|e| StorageError::Read {
                path: path.clone(),
                reason: format!("malformed state: {}", e),
            })?;

        debug!("Loaded {} seen ids from {}", record.len(), path.display());
        Ok(record)
    }

    /// Persist the record for `key`, replacing prior state.
    ///
    /// Writes a temporary file in the same directory and renames it over the
    /// target, so readers see either the old or the new state.
    pub fn save(&self, key: &str, record: &DedupRecord) -> Result<()> {
        let path = self.path_for(key);
        let write_err = |reason: String| StorageError::Write {
            path: path.clone(),
            reason,
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| write_err(e.to_string()))?;

        let mut json = serde_json::to_vec(record).map_err(|e| write_err(e.to_string()))?;
        json.push(b'\n');

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| write_err(e.to_string()))?;
        tmp.write_all(&json).map_err(|e| write_err(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| write_err(e.to_string()))?;
        tmp.persist(&path)
            .map_err(|e| write_err(e.error.to_string()))?;

        debug!("Saved {} seen ids to {}", record.len(), path.display());
        Ok(())
    }
}
