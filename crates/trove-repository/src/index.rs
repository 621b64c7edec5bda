use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trove_cache::{CacheError, PAYLOAD_LIMIT_BYTES};
use trove_coordinates::{ModelCoordinate, ProjectCoordinate, Version};

use crate::fingerprint::Fingerprint;

/// Maps project coordinates to the model artifacts trained for them.
pub trait ModelIndex: Send + Sync {
    /// The best model for `project` and `classifier`, if any.
    fn suggest(&self, project: &ProjectCoordinate, classifier: &str) -> Option<ModelCoordinate>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub coordinate: ProjectCoordinate,
    #[serde(default)]
    pub fingerprints: Vec<Fingerprint>,
    /// classifier -> model artifact
    #[serde(default)]
    pub models: BTreeMap<String, ModelCoordinate>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexDocument {
    #[serde(default)]
    entries: Vec<IndexEntry>,
}

/// A model index read from a JSON file.
///
/// A missing or unreadable file gives an inaccessible index: it suggests nothing.
#[derive(Debug, Default)]
pub struct JsonModelIndex {
    path: Option<PathBuf>,
    entries: Vec<IndexEntry>,
}

impl JsonModelIndex {
    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Self {
            path: None,
            entries,
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_index(&path) {
            Ok(Some(doc)) => doc.entries,
            Ok(None) => {
                tracing::debug!(
                    target: "trove.repository",
                    path = %path.display(),
                    "model index not found"
                );
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(
                    target: "trove.repository",
                    path = %path.display(),
                    error = %err,
                    "model index is inaccessible"
                );
                Vec::new()
            }
        };
        Self {
            path: Some(path),
            entries,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn project_for_fingerprint(&self, fingerprint: &Fingerprint) -> Option<ProjectCoordinate> {
        self.entries
            .iter()
            .find(|entry| entry.fingerprints.contains(fingerprint))
            .map(|entry| entry.coordinate.clone())
    }
}

impl ModelIndex for JsonModelIndex {
    /// Among entries for the same group and artifact that carry a `classifier`
    /// model, picks the one whose version is closest to the project's.
    fn suggest(&self, project: &ProjectCoordinate, classifier: &str) -> Option<ModelCoordinate> {
        let candidates: Vec<(Version, &ModelCoordinate)> = self
            .entries
            .iter()
            .filter(|entry| {
                entry.coordinate.group_id() == project.group_id()
                    && entry.coordinate.artifact_id() == project.artifact_id()
            })
            .filter_map(|entry| {
                let model = entry.models.get(classifier)?;
                Some((entry.coordinate.parsed_version(), model))
            })
            .collect();

        let target = project.parsed_version();
        let closest = Version::find_closest(&target, candidates.iter().map(|(v, _)| v))?;
        candidates
            .iter()
            .find(|(version, _)| version == closest)
            .map(|(_, model)| (*model).clone())
    }
}

fn read_index(path: &Path) -> Result<Option<IndexDocument>, CacheError> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if meta.len() > PAYLOAD_LIMIT_BYTES {
        return Err(std::io::Error::other(format!(
            "index too large: {} bytes (limit {PAYLOAD_LIMIT_BYTES})",
            meta.len()
        ))
        .into());
    }
    let bytes = std::fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}
