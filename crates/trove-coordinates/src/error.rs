use trove_cache::CacheError;

#[derive(Debug, thiserror::Error)]
pub enum CoordinateError {
    #[error("invalid coordinate `{input}`: {reason}")]
    InvalidCoordinate { input: String, reason: &'static str },

    #[error("invalid version `{input}`")]
    InvalidVersion { input: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {message}")]
    Zip { message: String },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<zip::result::ZipError> for CoordinateError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(err) => CoordinateError::Io(err),
            other => CoordinateError::Zip {
                message: other.to_string(),
            },
        }
    }
}
