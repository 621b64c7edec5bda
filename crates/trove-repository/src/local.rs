use std::path::{Path, PathBuf};

use trove_coordinates::ModelCoordinate;
use trove_scheduler::Progress;

use crate::{ModelRepository, RepositoryError};

/// A repository that only ever looks at local disk.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ModelRepository for LocalRepository {
    fn location(&self, coordinate: &ModelCoordinate) -> PathBuf {
        coordinate
            .repository_path()
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    fn resolve(
        &self,
        coordinate: &ModelCoordinate,
        _progress: &Progress,
    ) -> Result<PathBuf, RepositoryError> {
        Ok(self.location(coordinate))
    }
}
