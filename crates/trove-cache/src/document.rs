use crate::error::CacheError;
use crate::lock::CacheLock;
use crate::util::{atomic_write_with, now_millis, read_file_limited};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct DocumentRef<'a, T> {
    schema_version: u32,
    trove_version: &'a str,
    saved_at_millis: u64,
    entries: &'a [T],
}

#[derive(Deserialize)]
struct DocumentOwned<T> {
    schema_version: u32,
    #[serde(default)]
    trove_version: String,
    #[serde(default)]
    saved_at_millis: u64,
    entries: Vec<T>,
}

#[derive(Deserialize)]
struct DocumentHeader {
    schema_version: u32,
}

/// A versioned list of entries persisted as one JSON file.
///
/// Loading never fails: a missing, corrupt, oversized or incompatible file
/// is reported once and yields `None`, and the owner starts empty.
#[derive(Clone, Debug)]
pub struct JsonDocument {
    path: PathBuf,
    kind: &'static str,
    schema_version: u32,
}

impl JsonDocument {
    pub fn new(path: impl Into<PathBuf>, kind: &'static str, schema_version: u32) -> Self {
        Self {
            path: path.into(),
            kind,
            schema_version,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load<T: DeserializeOwned>(&self) -> Option<Vec<T>> {
        let bytes = read_file_limited(&self.path)?;

        // Check the header first so a schema bump is reported as such rather
        // than as whatever decode error the new entry shape would produce.
        match serde_json::from_slice::<DocumentHeader>(&bytes) {
            Ok(header) if header.schema_version != self.schema_version => {
                self.diagnostic(format_args!(
                    "unsupported schema version: expected {}, found {}",
                    self.schema_version, header.schema_version
                ));
                return None;
            }
            Ok(_) => {}
            Err(err) => {
                let err = CacheError::from(err);
                self.diagnostic(format_args!("failed to decode document header: {err}"));
                return None;
            }
        }

        match serde_json::from_slice::<DocumentOwned<T>>(&bytes) {
            Ok(doc) => {
                tracing::debug!(
                    target: "trove.cache",
                    kind = self.kind,
                    path = %self.path.display(),
                    entries = doc.entries.len(),
                    written_by = %doc.trove_version,
                    saved_at_millis = doc.saved_at_millis,
                    schema_version = doc.schema_version,
                    "loaded persisted document"
                );
                Some(doc.entries)
            }
            Err(err) => {
                let err = CacheError::from(err);
                self.diagnostic(format_args!("failed to decode document entries: {err}"));
                None
            }
        }
    }

    /// Replace the document with `entries`, atomically and under the sidecar lock.
    pub fn save<T: Serialize>(&self, entries: &[T]) -> Result<(), CacheError> {
        let _lock = CacheLock::for_document(&self.path)?;
        let doc = DocumentRef {
            schema_version: self.schema_version,
            trove_version: trove_core::TROVE_VERSION,
            saved_at_millis: now_millis(),
            entries,
        };

        atomic_write_with(&self.path, |file| {
            let mut out = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut out, &doc)?;
            out.flush()?;
            Ok(())
        })?;

        tracing::debug!(
            target: "trove.cache",
            kind = self.kind,
            path = %self.path.display(),
            entries = entries.len(),
            "saved persisted document"
        );
        Ok(())
    }

    fn diagnostic(&self, message: std::fmt::Arguments<'_>) {
        tracing::warn!(
            target: "trove.cache",
            kind = self.kind,
            path = %self.path.display(),
            "ignoring persisted document: {message}"
        );
    }
}
