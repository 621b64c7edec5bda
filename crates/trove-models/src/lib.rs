//! Model resolution and pooling.
//!
//! A [`ModelStore`] maps a caller's key to the dependency it came from, the
//! dependency to a project coordinate, and the coordinate to a model archive
//! resolved in the background by the [`Resolver`]. Every missing link yields
//! `None`; the interactive path never blocks on a download and never fails.

mod context;
mod error;
mod key;
mod registry;
mod resolver;
mod status;
mod store;

pub use context::ModelContext;
pub use error::ModelsError;
pub use key::{LocatedKey, ModelKey};
pub use registry::{ArchiveStatusRegistry, ARCHIVES_SCHEMA_VERSION};
pub use resolver::Resolver;
pub use status::{ArchiveStatus, ModelArchiveStatus};
pub use store::ModelStore;
