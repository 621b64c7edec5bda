use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use trove_cache::JsonDocument;
use trove_core::fs::modified_millis_optional;

use crate::coordinate::ProjectCoordinate;
use crate::error::CoordinateError;

pub const COORDINATES_SCHEMA_VERSION: u32 = 1;

/// A remembered identification of one dependency file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateStatus {
    pub location: PathBuf,
    /// Modification time of `location` (ms since the epoch) when it was identified.
    pub last_modified: u64,
    pub project_coordinate: ProjectCoordinate,
}

/// Maps dependency files to project coordinates, valid only while the file's
/// modification time is unchanged.
pub struct CoordinateRegistry {
    entries: DashMap<PathBuf, CoordinateStatus>,
    document: Option<JsonDocument>,
}

impl CoordinateRegistry {
    /// A registry that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            document: None,
        }
    }

    /// Load the registry stored at `path`, dropping entries whose file changed
    /// or disappeared. A missing or unreadable store yields an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let document = JsonDocument::new(path, "coordinates", COORDINATES_SCHEMA_VERSION);
        let entries = DashMap::new();
        let mut pruned = 0usize;
        for status in document.load::<CoordinateStatus>().unwrap_or_default() {
            if is_current(&status.location, status.last_modified) {
                entries.insert(status.location.clone(), status);
            } else {
                pruned += 1;
            }
        }

        tracing::debug!(
            target: "trove.coordinates",
            path = %document.path().display(),
            entries = entries.len(),
            pruned,
            "opened coordinate registry"
        );

        Self {
            entries,
            document: Some(document),
        }
    }

    /// The cached coordinate for `file`, if its modification time still matches.
    ///
    /// A stale entry is left in place; callers re-identify and [`set`](Self::set).
    pub fn lookup(&self, file: &Path) -> Option<ProjectCoordinate> {
        let status = self.entries.get(file)?;
        if is_current(file, status.last_modified) {
            Some(status.project_coordinate.clone())
        } else {
            None
        }
    }

    /// Record `coordinate` for `file`, capturing the file's current modification time.
    pub fn set(&self, file: &Path, coordinate: ProjectCoordinate) -> Result<(), CoordinateError> {
        let last_modified = trove_core::fs::modified_millis(file)?;
        self.entries.insert(
            file.to_path_buf(),
            CoordinateStatus {
                location: file.to_path_buf(),
                last_modified,
                project_coordinate: coordinate,
            },
        );
        Ok(())
    }

    pub fn remove(&self, file: &Path) -> Option<CoordinateStatus> {
        self.entries.remove(file).map(|(_, status)| status)
    }

    /// Snapshot of all entries ordered by location.
    pub fn entries(&self) -> Vec<CoordinateStatus> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| a.location.cmp(&b.location));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist all entries. Failures are returned, not swallowed.
    pub fn close(&self) -> Result<(), CoordinateError> {
        if let Some(document) = &self.document {
            document.save(&self.entries())?;
        }
        Ok(())
    }
}

fn is_current(file: &Path, recorded: u64) -> bool {
    match modified_millis_optional(file) {
        Ok(Some(current)) => current == recorded,
        Ok(None) => false,
        Err(err) => {
            tracing::debug!(
                target: "trove.coordinates",
                path = %file.display(),
                error = %err,
                "failed to stat dependency"
            );
            false
        }
    }
}
