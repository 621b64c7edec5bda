use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::coordinate::ProjectCoordinate;
use crate::dependency::{DependencyInfo, DependencyKind};
use crate::error::CoordinateError;

mod maven;
mod osgi;

pub use maven::MavenPomPropertiesAdvisor;
pub use osgi::OsgiManifestAdvisor;

/// Derives a [`ProjectCoordinate`] from a dependency's contents.
pub trait CoordinateAdvisor: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_applicable(&self, _kind: DependencyKind) -> bool {
        true
    }

    fn suggest(&self, dependency: &DependencyInfo) -> Option<ProjectCoordinate>;
}

/// Asks its advisors in order; the first suggestion wins.
#[derive(Clone, Default)]
pub struct AdvisorChain {
    advisors: Vec<Arc<dyn CoordinateAdvisor>>,
}

impl AdvisorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maven `pom.properties` first, then the OSGi manifest.
    pub fn with_defaults() -> Self {
        Self::new()
            .with(Arc::new(MavenPomPropertiesAdvisor))
            .with(Arc::new(OsgiManifestAdvisor))
    }

    pub fn with(mut self, advisor: Arc<dyn CoordinateAdvisor>) -> Self {
        self.advisors.push(advisor);
        self
    }

    pub fn push(&mut self, advisor: Arc<dyn CoordinateAdvisor>) {
        self.advisors.push(advisor);
    }

    pub fn len(&self) -> usize {
        self.advisors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advisors.is_empty()
    }
}

impl CoordinateAdvisor for AdvisorChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn is_applicable(&self, kind: DependencyKind) -> bool {
        self.advisors.iter().any(|advisor| advisor.is_applicable(kind))
    }

    fn suggest(&self, dependency: &DependencyInfo) -> Option<ProjectCoordinate> {
        self.advisors
            .iter()
            .filter(|advisor| advisor.is_applicable(dependency.kind))
            .find_map(|advisor| {
                let suggestion = advisor.suggest(dependency);
                if let Some(coordinate) = &suggestion {
                    tracing::debug!(
                        target: "trove.coordinates",
                        advisor = advisor.name(),
                        location = %dependency.location.display(),
                        coordinate = %coordinate,
                        "advisor suggested coordinate"
                    );
                }
                suggestion
            })
    }
}

const MAX_METADATA_ENTRY_BYTES: u64 = 1024 * 1024;

pub(crate) fn open_jar(path: &Path) -> Result<zip::ZipArchive<File>, CoordinateError> {
    Ok(zip::ZipArchive::new(File::open(path)?)?)
}

/// Read a small text entry; `Ok(None)` when absent.
pub(crate) fn read_text_entry(
    jar: &mut zip::ZipArchive<File>,
    name: &str,
) -> Result<Option<String>, CoordinateError> {
    let entry = match jar.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut text = String::new();
    entry
        .take(MAX_METADATA_ENTRY_BYTES)
        .read_to_string(&mut text)?;
    Ok(Some(text))
}

pub(crate) fn log_unreadable(advisor: &'static str, location: &Path, err: &CoordinateError) {
    tracing::debug!(
        target: "trove.coordinates",
        advisor,
        location = %location.display(),
        error = %err,
        "advisor could not read dependency"
    );
}
