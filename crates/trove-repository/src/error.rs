use trove_cache::CacheError;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{coordinate} not found in remote repository")]
    NotFound { coordinate: String },

    #[error("http error: {message}")]
    Http { message: String },

    #[error(transparent)]
    Cache(#[from] CacheError),
}
