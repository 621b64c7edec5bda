use std::sync::Arc;

use trove_archive::ModelLoader;
use trove_cache::{CacheConfig, CacheDir};
use trove_config::TroveConfig;
use trove_coordinates::{AdvisorChain, CoordinateAdvisor, CoordinateRegistry, ProjectCoordinateProvider};
use trove_repository::{
    FingerprintAdvisor, HttpRepository, JsonModelIndex, LocalRepository, ModelIndex, ModelRepository,
};
use trove_scheduler::{Executor, Scheduler, SchedulerConfig};

use crate::error::ModelsError;
use crate::key::ModelKey;
use crate::registry::ArchiveStatusRegistry;
use crate::resolver::Resolver;
use crate::store::ModelStore;

/// Registries, repository and worker pool shared by every [`ModelStore`].
pub struct ModelContext {
    provider: Arc<ProjectCoordinateProvider>,
    resolver: Arc<Resolver>,
    max_idle_per_key: usize,
}

impl ModelContext {
    pub fn open(config: &TroveConfig) -> Result<Self, ModelsError> {
        let cache = CacheDir::new(match &config.cache.root {
            Some(root) => CacheConfig::with_root(root),
            None => CacheConfig::from_env(),
        })?;

        let index = Arc::new(JsonModelIndex::load(
            config
                .repository
                .index
                .clone()
                .unwrap_or_else(|| cache.index_path()),
        ));
        let advisor = AdvisorChain::with_defaults()
            .with(Arc::new(FingerprintAdvisor::new(Arc::clone(&index))));

        let local = LocalRepository::new(
            config
                .repository
                .local_dir
                .clone()
                .unwrap_or_else(|| cache.repository_dir()),
        );
        let repository: Arc<dyn ModelRepository> = match &config.repository.remote_url {
            Some(url) => Arc::new(HttpRepository::new(local, url, config.repository.timeout())),
            None => Arc::new(local),
        };

        let scheduler = Scheduler::new(SchedulerConfig::with_background_threads(
            config.scheduler.background_threads,
        ));

        tracing::info!(
            target: "trove.models",
            cache = %cache.root().display(),
            remote = config.repository.remote_url.is_some(),
            index_entries = index.entries().len(),
            "opening model context"
        );

        Ok(Self::from_parts(
            Arc::new(CoordinateRegistry::open(cache.coordinates_path())),
            Arc::new(advisor),
            Arc::new(ArchiveStatusRegistry::open(cache.archives_path())),
            index,
            repository,
            Arc::new(scheduler),
            config.archive.max_idle_per_key,
        ))
    }

    /// Assemble a context from explicit parts.
    pub fn from_parts(
        coordinates: Arc<CoordinateRegistry>,
        advisor: Arc<dyn CoordinateAdvisor>,
        statuses: Arc<ArchiveStatusRegistry>,
        index: Arc<dyn ModelIndex>,
        repository: Arc<dyn ModelRepository>,
        executor: Arc<dyn Executor>,
        max_idle_per_key: usize,
    ) -> Self {
        Self {
            provider: Arc::new(ProjectCoordinateProvider::new(coordinates, advisor)),
            resolver: Arc::new(Resolver::new(statuses, index, repository, executor)),
            max_idle_per_key,
        }
    }

    /// A store for the `classifier` models built by `loader`.
    pub fn store<K: ModelKey, M: Send + 'static>(
        &self,
        classifier: impl Into<String>,
        loader: Arc<dyn ModelLoader<M>>,
    ) -> ModelStore<K, M> {
        ModelStore::new(
            classifier,
            Arc::clone(&self.provider),
            Arc::clone(&self.resolver),
            loader,
            self.max_idle_per_key,
        )
    }

    pub fn coordinates(&self) -> &Arc<CoordinateRegistry> {
        self.provider.registry()
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Persist both registries.
    pub fn close(&self) -> Result<(), ModelsError> {
        self.provider.registry().close()?;
        self.resolver.registry().close()?;
        tracing::debug!(target: "trove.models", "model context closed");
        Ok(())
    }
}
