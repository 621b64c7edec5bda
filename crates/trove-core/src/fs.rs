use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Modification time of `path` in milliseconds since the Unix epoch.
///
/// Times before the epoch are clamped to `0`.
pub fn modified_millis(path: &Path) -> io::Result<u64> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(system_time_millis(modified))
}

/// Like [`modified_millis`] but treats a missing file as `None`.
pub fn modified_millis_optional(path: &Path) -> io::Result<Option<u64>> {
    match modified_millis(path) {
        Ok(millis) => Ok(Some(millis)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

pub fn system_time_millis(time: SystemTime) -> u64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as u64,
        Err(_) => 0,
    }
}
