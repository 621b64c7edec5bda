use crate::error::CacheError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Upper bound for any persisted document read back from disk. Larger files
/// are a cache miss.
pub const PAYLOAD_LIMIT_BYTES: u64 = 64 * 1024 * 1024;

pub fn now_millis() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as u64,
        Err(err) => {
            static REPORTED: OnceLock<()> = OnceLock::new();
            if REPORTED.set(()).is_ok() {
                tracing::debug!(
                    target: "trove.cache",
                    error = %err,
                    "system time is before unix epoch; using 0 for now_millis"
                );
            }
            0
        }
    }
}

pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    atomic_write_with(path, |file| {
        file.write_all(bytes)?;
        Ok(())
    })
}

/// Write `path` through a uniquely named sibling temp file and rename it into place.
///
/// Readers never observe a partially written file.
pub fn atomic_write_with(
    path: &Path,
    write: impl FnOnce(&mut fs::File) -> Result<(), CacheError>,
) -> Result<(), CacheError> {
    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => {
            return Err(CacheError::NoParent {
                path: path.to_path_buf(),
            })
        }
    };
    fs::create_dir_all(parent)?;

    let (tmp_path, mut file) = open_unique_tmp_file(path, parent)?;
    let written = write(&mut file).and_then(|()| file.sync_all().map_err(CacheError::from));
    drop(file);
    if let Err(err) = written {
        remove_file_best_effort(&tmp_path, "atomic_write.write_failed");
        return Err(err);
    }

    if cfg!(windows) && path.exists() {
        // `rename` does not replace an existing file on Windows.
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                remove_file_best_effort(&tmp_path, "atomic_write.replace_failed");
                return Err(err.into());
            }
        }
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        remove_file_best_effort(&tmp_path, "atomic_write.rename_failed");
        return Err(err.into());
    }

    #[cfg(unix)]
    if let Err(err) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
        tracing::debug!(
            target: "trove.cache",
            dir = %parent.display(),
            error = %err,
            "failed to sync directory (best effort)"
        );
    }

    Ok(())
}

/// Read a whole file, treating absence, non-regular files and oversized payloads as a miss.
pub(crate) fn read_file_limited(path: &Path) -> Option<Vec<u8>> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    target: "trove.cache",
                    path = %path.display(),
                    error = %err,
                    "failed to stat persisted document"
                );
            }
            return None;
        }
    };
    if !meta.is_file() {
        tracing::warn!(
            target: "trove.cache",
            path = %path.display(),
            "persisted document is not a regular file"
        );
        return None;
    }
    if meta.len() > PAYLOAD_LIMIT_BYTES {
        tracing::warn!(
            target: "trove.cache",
            path = %path.display(),
            len = meta.len(),
            limit = PAYLOAD_LIMIT_BYTES,
            "persisted document too large"
        );
        return None;
    }

    match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    target: "trove.cache",
                    path = %path.display(),
                    error = %err,
                    "failed to read persisted document"
                );
            }
            None
        }
    }
}

pub(crate) fn remove_file_best_effort(path: &Path, reason: &'static str) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::debug!(
                target: "trove.cache",
                path = %path.display(),
                reason,
                error = %err,
                "failed to remove file"
            );
        }
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_contents_and_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/doc.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("doc.json")]);
    }

    #[test]
    fn failed_write_keeps_previous_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.json");
        atomic_write(&path, b"kept").unwrap();

        let err = atomic_write_with(&path, |_| Err(io::Error::other("boom").into()))
            .expect_err("write should fail");
        assert!(matches!(err, CacheError::Io(_)));
        assert_eq!(fs::read(&path).unwrap(), b"kept");
    }

    #[test]
    fn read_file_limited_misses_on_directories_and_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_file_limited(tmp.path()).is_none());
        assert!(read_file_limited(&tmp.path().join("missing")).is_none());

        let file = tmp.path().join("present");
        fs::write(&file, b"abc").unwrap();
        assert_eq!(read_file_limited(&file).unwrap(), b"abc");
    }
}
