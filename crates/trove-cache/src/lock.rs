use crate::error::CacheError;
use fs2::FileExt as _;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Exclusive lock guarding a persisted registry document.
///
/// Two layers: an in-process mutex keyed by lock path (fs2 locks do not
/// exclude threads of the same process on Unix) and an advisory file lock
/// for other processes sharing the cache root. Both are released on drop.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
    _guard: MutexGuard<'static, ()>,
}

impl CacheLock {
    /// Lock `<target>.lock`, the sidecar used for a document at `target`.
    pub fn for_document(target: &Path) -> Result<Self, CacheError> {
        Self::lock_exclusive(&lock_path_for(target))
    }

    /// Block until the lockfile at `path` is exclusively held, creating it if needed.
    pub fn lock_exclusive(path: &Path) -> Result<Self, CacheError> {
        let guard = in_process_mutex(path)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::debug!(
                target: "trove.cache",
                path = %self.path.display(),
                error = %err,
                "failed to release cache lock"
            );
        }
    }
}

fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".lock");
    target.with_file_name(name)
}

fn in_process_mutex(path: &Path) -> &'static Mutex<()> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();
    let mut locks = LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    locks
        .entry(path.to_path_buf())
        .or_insert_with(|| Box::leak(Box::new(Mutex::new(()))))
}
