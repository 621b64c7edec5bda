//! Where model archives come from.
//!
//! [`ModelIndex`] answers "which model artifact fits this dependency", and a
//! [`ModelRepository`] turns that artifact into a local file, downloading it
//! if needed. Both are only consulted from background resolution jobs.

mod error;
mod fingerprint;
mod http;
mod index;
mod local;
mod url;

pub use error::RepositoryError;
pub use fingerprint::{Fingerprint, FingerprintAdvisor};
pub use http::HttpRepository;
pub use index::{IndexEntry, JsonModelIndex, ModelIndex};
pub use local::LocalRepository;

use std::path::PathBuf;

use trove_coordinates::ModelCoordinate;
use trove_scheduler::Progress;

/// A store of model archives laid out like a Maven repository.
pub trait ModelRepository: Send + Sync {
    /// Where `coordinate` lives (or would live) on local disk.
    fn location(&self, coordinate: &ModelCoordinate) -> PathBuf;

    /// Make `coordinate` available locally and return its path. May block on
    /// network I/O. The returned path is not guaranteed to exist; callers check.
    fn resolve(
        &self,
        coordinate: &ModelCoordinate,
        progress: &Progress,
    ) -> Result<PathBuf, RepositoryError>;
}
