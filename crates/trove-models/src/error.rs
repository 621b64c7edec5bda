use thiserror::Error;
use trove_archive::ArchiveError;
use trove_cache::CacheError;
use trove_coordinates::CoordinateError;

#[derive(Debug, Error)]
pub enum ModelsError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Coordinates(#[from] CoordinateError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
