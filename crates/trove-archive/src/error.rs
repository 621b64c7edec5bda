use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive {path} still has {outstanding} acquired model(s)")]
    InUse { path: PathBuf, outstanding: usize },
}
