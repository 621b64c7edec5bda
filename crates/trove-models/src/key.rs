use std::path::{Path, PathBuf};

/// A caller-facing lookup key, e.g. a type together with where it was found.
pub trait ModelKey {
    /// The dependency JAR or project directory the key originates from.
    fn package_root(&self) -> Option<PathBuf>;

    /// The key's name inside a model archive.
    fn archive_key(&self) -> String;
}

/// A name paired with the package root it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocatedKey {
    root: Option<PathBuf>,
    name: String,
}

impl LocatedKey {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: Some(root.into()),
            name: name.into(),
        }
    }

    /// A key whose origin is unknown (e.g. a type from a source file).
    pub fn unrooted(name: impl Into<String>) -> Self {
        Self {
            root: None,
            name: name.into(),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ModelKey for LocatedKey {
    fn package_root(&self) -> Option<PathBuf> {
        self.root.clone()
    }

    fn archive_key(&self) -> String {
        self.name.clone()
    }
}
