use std::fmt;

use serde::{Deserialize, Serialize};
use trove_coordinates::{ModelCoordinate, ProjectCoordinate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchiveStatus {
    Unresolved,
    Downloading,
    Resolved,
    Failed,
}

impl fmt::Display for ArchiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArchiveStatus::Unresolved => "UNRESOLVED",
            ArchiveStatus::Downloading => "DOWNLOADING",
            ArchiveStatus::Resolved => "RESOLVED",
            ArchiveStatus::Failed => "FAILED",
        })
    }
}

/// Resolution state of the `classifier` model archive for one project.
///
/// Fields change only through the transition methods, so a status is
/// [`ArchiveStatus::Resolved`] only when it carries a resolved coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArchiveStatus {
    project_coordinate: ProjectCoordinate,
    classifier: String,
    #[serde(default)]
    resolved_coordinate: Option<ModelCoordinate>,
    download_status: ArchiveStatus,
    #[serde(default)]
    errors: Vec<String>,
}

impl ModelArchiveStatus {
    pub fn unresolved(project_coordinate: ProjectCoordinate, classifier: impl Into<String>) -> Self {
        Self {
            project_coordinate,
            classifier: classifier.into(),
            resolved_coordinate: None,
            download_status: ArchiveStatus::Unresolved,
            errors: Vec::new(),
        }
    }

    pub fn project_coordinate(&self) -> &ProjectCoordinate {
        &self.project_coordinate
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn resolved_coordinate(&self) -> Option<&ModelCoordinate> {
        self.resolved_coordinate.as_ref()
    }

    pub fn download_status(&self) -> ArchiveStatus {
        self.download_status
    }

    /// Accumulated failure messages, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_resolved(&self) -> bool {
        self.download_status == ArchiveStatus::Resolved
    }

    /// UNRESOLVED -> DOWNLOADING. Returns whether the transition happened.
    pub(crate) fn begin_download(&mut self) -> bool {
        if self.download_status != ArchiveStatus::Unresolved {
            return false;
        }
        self.download_status = ArchiveStatus::Downloading;
        true
    }

    pub(crate) fn record_resolved(&mut self, coordinate: ModelCoordinate) {
        self.resolved_coordinate = Some(coordinate);
        self.download_status = ArchiveStatus::Resolved;
    }

    pub(crate) fn record_failure(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.download_status = ArchiveStatus::Failed;
    }

    pub(crate) fn set_resolved_coordinate(&mut self, coordinate: ModelCoordinate) {
        self.resolved_coordinate = Some(coordinate);
    }

    /// FAILED -> UNRESOLVED, keeping the error history.
    pub(crate) fn retry(&mut self) -> bool {
        if self.download_status != ArchiveStatus::Failed {
            return false;
        }
        self.download_status = ArchiveStatus::Unresolved;
        true
    }

    /// RESOLVED -> UNRESOLVED, for an archive whose file is gone. The resolved
    /// coordinate is kept until the next resolution replaces it.
    pub(crate) fn invalidate(&mut self) -> bool {
        if self.download_status != ArchiveStatus::Resolved {
            return false;
        }
        self.download_status = ArchiveStatus::Unresolved;
        true
    }

    /// Bring a status loaded from disk back to a state this process can act on.
    pub(crate) fn normalize_loaded(&mut self) -> bool {
        match self.download_status {
            ArchiveStatus::Downloading => {
                self.download_status = ArchiveStatus::Unresolved;
                true
            }
            ArchiveStatus::Resolved if self.resolved_coordinate.is_none() => {
                self.download_status = ArchiveStatus::Unresolved;
                true
            }
            _ => false,
        }
    }
}
