//! Persisted snapshot of the last parsed tree (`<buildPath>/db.json`).
//!
//! The snapshot is a read-through cache: it is reused only when it was written
//! for exactly the same base and build paths, and a fresh scan always wins.

mod record;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SnapshotError;
use crate::model::Mocker;

pub use record::{MockerRecord, ModuleRecord};

pub const SNAPSHOT_FILE: &str = "db.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub mock_server_path: PathBuf,
    pub build_path: PathBuf,
    pub data: Vec<MockerRecord>,
}

impl SnapshotRecord {
    pub fn new(mock_server_path: &Path, build_path: &Path, mockers: &[Arc<Mocker>]) -> Self {
        Self {
            mock_server_path: mock_server_path.to_path_buf(),
            build_path: build_path.to_path_buf(),
            data: mockers.iter().map(|m| MockerRecord::from(m.as_ref())).collect(),
        }
    }

    /// True when this snapshot was written for the given paths.
    pub fn is_for(&self, mock_server_path: &Path, build_path: &Path) -> bool {
        self.mock_server_path == mock_server_path && self.build_path == build_path
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    build_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(build_path: impl Into<PathBuf>) -> Self {
        Self {
            build_path: build_path.into(),
        }
    }

    pub fn build_path(&self) -> &Path {
        &self.build_path
    }

    pub fn file_path(&self) -> PathBuf {
        self.build_path.join(SNAPSHOT_FILE)
    }

    /// Write the snapshot for `mockers`, creating the build directory.
    pub fn save(&self, mock_server_path: &Path, mockers: &[Arc<Mocker>]) -> Result<(), SnapshotError> {
        let path = self.file_path();
        fs::create_dir_all(&self.build_path)
            .map_err(|e| SnapshotError::Io(self.build_path.clone(), e))?;

        let record = SnapshotRecord::new(mock_server_path, &self.build_path, mockers);
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| SnapshotError::Format(path.clone(), e))?;

        fs::write(&path, json).map_err(|e| SnapshotError::Io(path.clone(), e))?;
        info!("Saved snapshot of {} mockers to {}", mockers.len(), path.display());
        Ok(())
    }

    /// Read the snapshot; `Ok(None)` when none has been written yet.
    pub fn load(&self) -> Result<Option<SnapshotRecord>, SnapshotError> {
        let path = self.file_path();
        if !path.exists() {
            debug!("Snapshot {} does not exist", path.display());
            return Ok(None);
        }

        let json = fs::read_to_string(&path).map_err(|e| SnapshotError::Io(path.clone(), e))?;
        let record: SnapshotRecord =
            serde_json::from_str(&json).map_err(|e| SnapshotError::Format(path.clone(), e))?;

        debug!(
            "Loaded snapshot of {} mockers from {}",
            record.data.len(),
            path.display()
        );
        Ok(Some(record))
    }

    /// Read the snapshot only if it was written for `mock_server_path` and
    /// this store's build path.
    pub fn load_matching(
        &self,
        mock_server_path: &Path,
    ) -> Result<Option<SnapshotRecord>, SnapshotError> {
        Ok(self
            .load()?
            .filter(|record| record.is_for(mock_server_path, &self.build_path)))
    }
}
