use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use trove_archive::{AcquiredModel, ModelArchive, ModelId, ModelLoader, NullArchive, ZipModelArchive};
use trove_coordinates::{ProjectCoordinate, ProjectCoordinateProvider};

use crate::error::ModelsError;
use crate::key::ModelKey;
use crate::resolver::Resolver;
use crate::status::ModelArchiveStatus;

/// Pools the `classifier` models of every dependency for keys of type `K`.
///
/// `acquire` never fails and never blocks on network I/O: anything not yet
/// resolved, missing or unreadable comes back as `None`.
pub struct ModelStore<K, M> {
    classifier: String,
    provider: Arc<ProjectCoordinateProvider>,
    resolver: Arc<Resolver>,
    loader: Arc<dyn ModelLoader<M>>,
    max_idle_per_key: usize,
    archives: DashMap<ProjectCoordinate, Arc<ZipModelArchive<M>>>,
    issued: DashMap<ModelId, Arc<ZipModelArchive<M>>>,
    null: Arc<dyn ModelArchive<M>>,
    _key: PhantomData<fn(&K)>,
}

impl<K: ModelKey, M: Send + 'static> ModelStore<K, M> {
    pub fn new(
        classifier: impl Into<String>,
        provider: Arc<ProjectCoordinateProvider>,
        resolver: Arc<Resolver>,
        loader: Arc<dyn ModelLoader<M>>,
        max_idle_per_key: usize,
    ) -> Self {
        Self {
            classifier: classifier.into(),
            provider,
            resolver,
            loader,
            max_idle_per_key,
            archives: DashMap::new(),
            issued: DashMap::new(),
            null: Arc::new(NullArchive),
            _key: PhantomData,
        }
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    /// A model for `key`, held exclusively until passed to [`release`](Self::release).
    pub fn acquire(&self, key: &K) -> Option<AcquiredModel<M>> {
        let archive = self.archive_for_key(key)?;
        let model = archive.acquire_model(&key.archive_key())?;
        self.issued.insert(model.id(), archive);
        Some(model)
    }

    /// Whether a model exists for `key`, without building it.
    pub fn has_model(&self, key: &K) -> bool {
        self.archive_for_key(key)
            .is_some_and(|archive| archive.has_model(&key.archive_key()))
    }

    /// Hand `model` back to the archive that issued it.
    pub fn release(&self, model: AcquiredModel<M>) {
        match self.issued.remove(&model.id()) {
            Some((_, archive)) => archive.release_model(model),
            None => tracing::warn!(
                target: "trove.models",
                classifier = %self.classifier,
                key = %model.key(),
                "released a model this store did not issue"
            ),
        }
    }

    /// The archive for `coordinate`, or the empty archive until it is resolved.
    ///
    /// Schedules resolution if the coordinate has not been seen yet.
    pub fn archive_for(&self, coordinate: &ProjectCoordinate) -> Arc<dyn ModelArchive<M>> {
        match self.resolved_archive(coordinate) {
            Some(archive) => archive as Arc<dyn ModelArchive<M>>,
            None => Arc::clone(&self.null),
        }
    }

    /// Close and forget the archive for `coordinate`. Fails while any of its
    /// models are acquired. Returns whether an archive was open.
    pub fn evict(&self, coordinate: &ProjectCoordinate) -> Result<bool, ModelsError> {
        match self.archives.entry(coordinate.clone()) {
            Entry::Occupied(entry) => {
                entry.get().close()?;
                entry.remove();
                Ok(true)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    /// Statuses of this store's classifier, for diagnostics.
    pub fn statuses(&self) -> Vec<ModelArchiveStatus> {
        self.resolver
            .registry()
            .statuses()
            .into_iter()
            .filter(|status| status.classifier() == self.classifier)
            .collect()
    }

    /// Persist both registries and close idle archives. Archives with
    /// acquired models stay open.
    pub fn close(&self) -> Result<(), ModelsError> {
        self.archives.retain(|coordinate, archive| match archive.close() {
            Ok(()) => false,
            Err(err) => {
                tracing::debug!(
                    target: "trove.models",
                    coordinate = %coordinate,
                    error = %err,
                    "keeping archive open"
                );
                true
            }
        });
        self.provider.registry().close()?;
        self.resolver.registry().close()?;
        Ok(())
    }

    fn archive_for_key(&self, key: &K) -> Option<Arc<ZipModelArchive<M>>> {
        let Some(root) = key.package_root() else {
            tracing::debug!(
                target: "trove.models",
                key = %key.archive_key(),
                "key has no package root"
            );
            return None;
        };
        let coordinate = self.provider.resolve(&root)?;
        self.resolved_archive(&coordinate)
    }

    fn resolved_archive(&self, coordinate: &ProjectCoordinate) -> Option<Arc<ZipModelArchive<M>>> {
        let status = self.resolver.ensure_resolution(coordinate, &self.classifier);
        let model = status.resolved_coordinate().filter(|_| status.is_resolved())?;

        if let Some(archive) = self.archives.get(coordinate) {
            return Some(Arc::clone(archive.value()));
        }

        let path = self.resolver.repository().location(model);
        if !path.is_file() {
            self.resolver.reresolve_missing(coordinate, &self.classifier, &path);
            return None;
        }

        let entry = self
            .archives
            .entry(coordinate.clone())
            .or_insert_with(|| {
                tracing::debug!(
                    target: "trove.models",
                    coordinate = %coordinate,
                    model = %model,
                    path = %path.display(),
                    "attaching model archive"
                );
                Arc::new(ZipModelArchive::new(
                    path.clone(),
                    Arc::clone(&self.loader),
                    self.max_idle_per_key,
                ))
            });
        Some(Arc::clone(entry.value()))
    }
}
