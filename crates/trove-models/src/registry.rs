use std::path::PathBuf;

use dashmap::DashMap;
use trove_cache::{CacheError, JsonDocument};
use trove_coordinates::ProjectCoordinate;

use crate::status::ModelArchiveStatus;

pub const ARCHIVES_SCHEMA_VERSION: u32 = 1;

type StatusKey = (ProjectCoordinate, String);

/// One [`ModelArchiveStatus`] per (project coordinate, classifier).
///
/// Every read and update of a single key happens under that key's map shard
/// lock, so concurrent first lookups cannot both see UNRESOLVED.
pub struct ArchiveStatusRegistry {
    entries: DashMap<StatusKey, ModelArchiveStatus>,
    document: Option<JsonDocument>,
}

impl ArchiveStatusRegistry {
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            document: None,
        }
    }

    /// Load the registry stored at `path`. Statuses that were mid-download
    /// when saved come back UNRESOLVED.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let document = JsonDocument::new(path, "archives", ARCHIVES_SCHEMA_VERSION);
        let entries = DashMap::new();
        let mut reset = 0usize;
        for mut status in document.load::<ModelArchiveStatus>().unwrap_or_default() {
            if status.normalize_loaded() {
                reset += 1;
            }
            let key = key_of(&status);
            entries.insert(key, status);
        }

        tracing::debug!(
            target: "trove.models",
            path = %document.path().display(),
            entries = entries.len(),
            reset,
            "opened archive status registry"
        );

        Self {
            entries,
            document: Some(document),
        }
    }

    /// The status for the pair, creating an UNRESOLVED one on first sight.
    pub fn get_or_create(
        &self,
        coordinate: &ProjectCoordinate,
        classifier: &str,
    ) -> ModelArchiveStatus {
        self.transition(coordinate, classifier, |status| status.clone())
    }

    /// The status for the pair without creating one.
    pub fn get(&self, coordinate: &ProjectCoordinate, classifier: &str) -> Option<ModelArchiveStatus> {
        self.entries
            .get(&(coordinate.clone(), classifier.to_owned()))
            .map(|entry| entry.value().clone())
    }

    /// Overwrite the status stored under `status`'s own key.
    pub fn set(&self, status: ModelArchiveStatus) {
        self.entries.insert(key_of(&status), status);
    }

    /// Run `update` on the pair's status (created UNRESOLVED if absent) while
    /// holding the key's lock.
    pub fn transition<R>(
        &self,
        coordinate: &ProjectCoordinate,
        classifier: &str,
        update: impl FnOnce(&mut ModelArchiveStatus) -> R,
    ) -> R {
        let mut entry = self
            .entries
            .entry((coordinate.clone(), classifier.to_owned()))
            .or_insert_with(|| ModelArchiveStatus::unresolved(coordinate.clone(), classifier));
        update(entry.value_mut())
    }

    /// Run `update` on the pair's status only if one exists.
    pub fn transition_existing<R>(
        &self,
        coordinate: &ProjectCoordinate,
        classifier: &str,
        update: impl FnOnce(&mut ModelArchiveStatus) -> R,
    ) -> Option<R> {
        self.entries
            .get_mut(&(coordinate.clone(), classifier.to_owned()))
            .map(|mut entry| update(entry.value_mut()))
    }

    /// Snapshot of all statuses ordered by coordinate, then classifier.
    pub fn statuses(&self) -> Vec<ModelArchiveStatus> {
        let mut statuses: Vec<_> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        statuses.sort_by(|a, b| {
            a.project_coordinate()
                .cmp(b.project_coordinate())
                .then_with(|| a.classifier().cmp(b.classifier()))
        });
        statuses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn close(&self) -> Result<(), CacheError> {
        if let Some(document) = &self.document {
            document.save(&self.statuses())?;
        }
        Ok(())
    }
}

fn key_of(status: &ModelArchiveStatus) -> StatusKey {
    (
        status.project_coordinate().clone(),
        status.classifier().to_owned(),
    )
}
