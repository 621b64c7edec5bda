use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use zip::ZipArchive;

use crate::{AcquiredModel, ArchiveError, ModelArchive, ModelId, ModelLoader};

const ENTRY_LIMIT_BYTES: u64 = 64 * 1024 * 1024;

enum Container {
    Unopened,
    Open {
        zip: ZipArchive<BufReader<File>>,
        names: HashSet<String>,
    },
    Unreadable,
    Closed,
}

struct State<M> {
    container: Container,
    idle: HashMap<String, Vec<M>>,
    outstanding: HashMap<ModelId, String>,
}

/// A zip archive of model entries, opened on first use.
pub struct ZipModelArchive<M> {
    path: PathBuf,
    loader: Arc<dyn ModelLoader<M>>,
    max_idle_per_key: usize,
    state: Mutex<State<M>>,
}

impl<M> std::fmt::Debug for ZipModelArchive<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipModelArchive")
            .field("path", &self.path)
            .field("max_idle_per_key", &self.max_idle_per_key)
            .finish_non_exhaustive()
    }
}

impl<M: Send + 'static> ZipModelArchive<M> {
    pub fn new(
        path: impl Into<PathBuf>,
        loader: Arc<dyn ModelLoader<M>>,
        max_idle_per_key: usize,
    ) -> Self {
        Self {
            path: path.into(),
            loader,
            max_idle_per_key,
            state: Mutex::new(State {
                container: Container::Unopened,
                idle: HashMap::new(),
                outstanding: HashMap::new(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the zip file is currently held open.
    pub fn is_open(&self) -> bool {
        matches!(self.state.lock().container, Container::Open { .. })
    }

    /// Released instances waiting for reuse under `key`.
    pub fn idle_count(&self, key: &str) -> usize {
        self.state.lock().idle.get(key).map_or(0, Vec::len)
    }

    fn ensure_open(&self, container: &mut Container) {
        if !matches!(container, Container::Unopened) {
            return;
        }
        *container = match open_zip(&self.path) {
            Ok((zip, names)) => {
                tracing::debug!(
                    target: "trove.archive",
                    path = %self.path.display(),
                    entries = names.len(),
                    "opened model archive"
                );
                Container::Open { zip, names }
            }
            Err(err) => {
                tracing::warn!(
                    target: "trove.archive",
                    path = %self.path.display(),
                    error = %format!("{err:#}"),
                    "failed to open model archive; treating it as empty"
                );
                Container::Unreadable
            }
        };
    }

    fn load(&self, key: &str, bytes: Vec<u8>) -> Option<M> {
        match self.loader.load(key, &bytes) {
            Ok(model) => Some(model),
            Err(err) => {
                tracing::warn!(
                    target: "trove.archive",
                    path = %self.path.display(),
                    key,
                    error = %format!("{err:#}"),
                    "failed to load model entry; treating it as absent"
                );
                None
            }
        }
    }
}

fn open_zip(path: &Path) -> anyhow::Result<(ZipArchive<BufReader<File>>, HashSet<String>)> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let zip = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("read zip index {}", path.display()))?;
    let names = zip.file_names().map(str::to_owned).collect();
    Ok((zip, names))
}

fn read_entry(zip: &mut ZipArchive<BufReader<File>>, name: &str) -> anyhow::Result<Vec<u8>> {
    let entry = zip
        .by_name(name)
        .with_context(|| format!("open entry {name}"))?;
    let mut bytes = Vec::with_capacity(entry.size().min(ENTRY_LIMIT_BYTES) as usize);
    entry
        .take(ENTRY_LIMIT_BYTES + 1)
        .read_to_end(&mut bytes)
        .with_context(|| format!("decompress entry {name}"))?;
    anyhow::ensure!(
        bytes.len() as u64 <= ENTRY_LIMIT_BYTES,
        "entry {name} exceeds {ENTRY_LIMIT_BYTES} bytes"
    );
    Ok(bytes)
}

impl<M: Send + 'static> ModelArchive<M> for ZipModelArchive<M> {
    fn has_model(&self, key: &str) -> bool {
        let entry = self.loader.entry_name(key);
        let mut state = self.state.lock();
        self.ensure_open(&mut state.container);
        match &state.container {
            Container::Open { names, .. } => names.contains(&entry),
            _ => false,
        }
    }

    fn acquire_model(&self, key: &str) -> Option<AcquiredModel<M>> {
        let entry = self.loader.entry_name(key);
        let id = ModelId::next();

        let bytes = {
            let mut state = self.state.lock();
            self.ensure_open(&mut state.container);
            if !matches!(state.container, Container::Open { .. }) {
                return None;
            }
            if let Some(model) = state.idle.get_mut(key).and_then(Vec::pop) {
                state.outstanding.insert(id, key.to_owned());
                return Some(AcquiredModel::new(id, key.to_owned(), model));
            }
            let Container::Open { zip, names } = &mut state.container else {
                return None;
            };
            if !names.contains(&entry) {
                return None;
            }
            match read_entry(zip, &entry) {
                Ok(bytes) => {
                    // Reserve the id so `close` sees the load in flight.
                    state.outstanding.insert(id, key.to_owned());
                    bytes
                }
                Err(err) => {
                    tracing::warn!(
                        target: "trove.archive",
                        path = %self.path.display(),
                        key,
                        error = %format!("{err:#}"),
                        "failed to read model entry; treating it as absent"
                    );
                    return None;
                }
            }
        };

        match self.load(key, bytes) {
            Some(model) => Some(AcquiredModel::new(id, key.to_owned(), model)),
            None => {
                self.state.lock().outstanding.remove(&id);
                None
            }
        }
    }

    fn release_model(&self, model: AcquiredModel<M>) {
        let (id, key, mut model) = model.into_parts();
        self.loader.reset(&mut model);

        let mut state = self.state.lock();
        if state.outstanding.remove(&id).is_none() {
            tracing::warn!(
                target: "trove.archive",
                path = %self.path.display(),
                key = %key,
                id = id.as_u64(),
                "released a model this archive did not hand out"
            );
            return;
        }
        if !matches!(state.container, Container::Open { .. }) {
            return;
        }
        let pool = state.idle.entry(key).or_default();
        if pool.len() < self.max_idle_per_key {
            pool.push(model);
        }
    }

    fn outstanding(&self) -> usize {
        self.state.lock().outstanding.len()
    }

    fn close(&self) -> Result<(), ArchiveError> {
        let mut state = self.state.lock();
        let outstanding = state.outstanding.len();
        if outstanding > 0 {
            return Err(ArchiveError::InUse {
                path: self.path.clone(),
                outstanding,
            });
        }
        state.idle.clear();
        state.container = Container::Closed;
        tracing::debug!(
            target: "trove.archive",
            path = %self.path.display(),
            "closed model archive"
        );
        Ok(())
    }
}
