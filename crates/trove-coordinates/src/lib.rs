//! Stable identities for binary dependencies and model artifacts.
//!
//! A [`ProjectCoordinate`] names a dependency independent of where its file
//! lives; advisors derive one from the file's contents and the
//! [`CoordinateRegistry`] remembers the answer for as long as the file's
//! modification time stays put.

mod advisor;
mod coordinate;
mod dependency;
mod error;
mod provider;
mod registry;
mod version;

pub use advisor::{
    AdvisorChain, CoordinateAdvisor, MavenPomPropertiesAdvisor, OsgiManifestAdvisor,
};
pub use coordinate::{ModelCoordinate, ProjectCoordinate, DEFAULT_MODEL_EXTENSION};
pub use dependency::{DependencyInfo, DependencyKind};
pub use error::CoordinateError;
pub use provider::ProjectCoordinateProvider;
pub use registry::{CoordinateRegistry, CoordinateStatus, COORDINATES_SCHEMA_VERSION};
pub use version::Version;
