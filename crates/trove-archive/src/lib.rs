//! Model archives: zip containers holding one trained model per key.
//!
//! Archives open lazily and hand out [`AcquiredModel`]s. Two callers never
//! share an instance: the same key acquired twice yields two independent
//! models, and released models are reset and pooled for reuse.

mod error;
mod loader;
mod model;
mod null;
mod zip_archive;

pub use error::ArchiveError;
pub use loader::{entry_name, ModelLoader};
pub use model::{AcquiredModel, ModelId};
pub use null::NullArchive;
pub use zip_archive::ZipModelArchive;

/// A source of models keyed by name (typically a type name).
pub trait ModelArchive<M>: Send + Sync {
    /// Whether an entry exists for `key`. Does not build the model.
    fn has_model(&self, key: &str) -> bool;

    /// An instance for `key` held exclusively by the caller until released,
    /// or `None` if the key is absent or its entry is unreadable.
    fn acquire_model(&self, key: &str) -> Option<AcquiredModel<M>>;

    fn release_model(&self, model: AcquiredModel<M>);

    /// Models acquired and not yet released.
    fn outstanding(&self) -> usize;

    /// Release the underlying file. Fails while any model is outstanding.
    fn close(&self) -> Result<(), ArchiveError>;
}
