//! On-disk building blocks shared by Trove's persistent registries.
//!
//! ## On-disk layout
//!
//! Everything lives under a single cache root (default `~/.trove/cache`,
//! overridable through [`CacheConfig`] or `TROVE_CACHE_DIR`):
//! - `registry/coordinates.json`: dependency file -> project coordinate mappings
//! - `registry/archives.json`: per (coordinate, classifier) model archive status
//! - `repository/`: Maven-layout local model repository
//! - `index.json`: default location of the model index
//!
//! Registry files are [`JsonDocument`]s: a versioned JSON wrapper written
//! atomically under a cross-process [`CacheLock`]. Unreadable or incompatible
//! documents degrade to a cache miss.

mod cache_dir;
mod document;
mod error;
mod lock;
mod util;

pub use cache_dir::{CacheConfig, CacheDir};
pub use document::JsonDocument;
pub use error::{CacheError, Result};
pub use lock::CacheLock;
pub use util::{atomic_write, atomic_write_with, now_millis, PAYLOAD_LIMIT_BYTES};
