use crate::error::CacheError;
use std::path::{Path, PathBuf};

pub const CACHE_DIR_ENV: &str = "TROVE_CACHE_DIR";

/// Selects where the cache root lives.
#[derive(Clone, Debug, Default)]
pub struct CacheConfig {
    pub root_override: Option<PathBuf>,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            root_override: std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from),
        }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_override: Some(root.into()),
        }
    }
}

/// Resolved cache root with its `registry/` and `repository/` subdirectories created.
#[derive(Clone, Debug)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let root = match config.root_override {
            Some(root) => root,
            None => default_cache_root()?,
        };

        std::fs::create_dir_all(root.join("registry"))?;
        std::fs::create_dir_all(root.join("repository"))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_dir(&self) -> PathBuf {
        self.root.join("registry")
    }

    pub fn coordinates_path(&self) -> PathBuf {
        self.registry_dir().join("coordinates.json")
    }

    pub fn archives_path(&self) -> PathBuf {
        self.registry_dir().join("archives.json")
    }

    pub fn repository_dir(&self) -> PathBuf {
        self.root.join("repository")
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }
}

fn default_cache_root() -> Result<PathBuf, CacheError> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or(CacheError::MissingHomeDir)?;

    Ok(home.join(".trove").join("cache"))
}
