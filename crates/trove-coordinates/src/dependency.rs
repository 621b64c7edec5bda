use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// A packaged archive such as a JAR.
    Jar,
    /// An exploded project directory.
    Project,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyInfo {
    pub location: PathBuf,
    pub kind: DependencyKind,
}

impl DependencyInfo {
    pub fn new(location: impl Into<PathBuf>, kind: DependencyKind) -> Self {
        Self {
            location: location.into(),
            kind,
        }
    }

    /// Directories are projects; everything else is treated as a JAR.
    pub fn for_location(location: &Path) -> Self {
        let kind = if location.is_dir() {
            DependencyKind::Project
        } else {
            DependencyKind::Jar
        };
        Self::new(location, kind)
    }
}
