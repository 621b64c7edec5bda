use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use trove_coordinates::{CoordinateAdvisor, DependencyInfo, DependencyKind, ProjectCoordinate};

use crate::index::JsonModelIndex;

/// SHA-256 of a file's contents as lowercase hex.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes.as_ref());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn from_reader(mut reader: impl Read) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0_u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a JAR by looking its content hash up in the model index.
#[derive(Clone)]
pub struct FingerprintAdvisor {
    index: Arc<JsonModelIndex>,
}

impl FingerprintAdvisor {
    pub fn new(index: Arc<JsonModelIndex>) -> Self {
        Self { index }
    }
}

impl CoordinateAdvisor for FingerprintAdvisor {
    fn name(&self) -> &'static str {
        "fingerprint"
    }

    fn is_applicable(&self, kind: DependencyKind) -> bool {
        kind == DependencyKind::Jar
    }

    fn suggest(&self, dependency: &DependencyInfo) -> Option<ProjectCoordinate> {
        if !self.is_applicable(dependency.kind) || self.index.is_empty() {
            return None;
        }
        match Fingerprint::from_file(&dependency.location) {
            Ok(fingerprint) => self.index.project_for_fingerprint(&fingerprint),
            Err(err) => {
                tracing::debug!(
                    target: "trove.repository",
                    location = %dependency.location.display(),
                    error = %err,
                    "failed to fingerprint dependency"
                );
                None
            }
        }
    }
}
