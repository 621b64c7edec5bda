use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use trove_coordinates::{ModelCoordinate, ProjectCoordinate};
use trove_core::panic_payload_to_str;
use trove_repository::{ModelIndex, ModelRepository};
use trove_scheduler::{Executor, Progress};

use crate::registry::ArchiveStatusRegistry;
use crate::status::{ArchiveStatus, ModelArchiveStatus};

/// Drives archive statuses from UNRESOLVED to RESOLVED or FAILED.
///
/// Resolution jobs run on the executor; nothing here waits for one.
#[derive(Clone)]
pub struct Resolver {
    registry: Arc<ArchiveStatusRegistry>,
    index: Arc<dyn ModelIndex>,
    repository: Arc<dyn ModelRepository>,
    executor: Arc<dyn Executor>,
}

impl Resolver {
    pub fn new(
        registry: Arc<ArchiveStatusRegistry>,
        index: Arc<dyn ModelIndex>,
        repository: Arc<dyn ModelRepository>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            registry,
            index,
            repository,
            executor,
        }
    }

    pub fn registry(&self) -> &Arc<ArchiveStatusRegistry> {
        &self.registry
    }

    pub fn repository(&self) -> &Arc<dyn ModelRepository> {
        &self.repository
    }

    /// The current status for the pair. An UNRESOLVED status moves to
    /// DOWNLOADING and gets exactly one resolution job; any other status is
    /// returned as is.
    pub fn ensure_resolution(
        &self,
        coordinate: &ProjectCoordinate,
        classifier: &str,
    ) -> ModelArchiveStatus {
        if let Some(status) = self.registry.get(coordinate, classifier) {
            if status.download_status() != ArchiveStatus::Unresolved {
                return status;
            }
        }

        let (status, scheduled) = self.registry.transition(coordinate, classifier, |status| {
            let scheduled = status.begin_download();
            (status.clone(), scheduled)
        });

        if scheduled {
            tracing::debug!(
                target: "trove.models",
                coordinate = %coordinate,
                classifier,
                "scheduling model resolution"
            );
            self.submit(coordinate.clone(), classifier.to_owned());
        }
        status
    }

    /// FAILED -> UNRESOLVED so the next lookup schedules a fresh job. Returns
    /// whether the status changed; unknown pairs stay unknown.
    pub fn request_reresolution(&self, coordinate: &ProjectCoordinate, classifier: &str) -> bool {
        let reset = self
            .registry
            .transition_existing(coordinate, classifier, ModelArchiveStatus::retry)
            .unwrap_or(false);
        if reset {
            tracing::info!(
                target: "trove.models",
                coordinate = %coordinate,
                classifier,
                "re-resolution requested"
            );
        }
        reset
    }

    /// A RESOLVED archive whose file disappeared goes back to UNRESOLVED and
    /// is resolved again.
    pub(crate) fn reresolve_missing(&self, coordinate: &ProjectCoordinate, classifier: &str, path: &Path) {
        let invalidated = self
            .registry
            .transition_existing(coordinate, classifier, ModelArchiveStatus::invalidate)
            .unwrap_or(false);
        if !invalidated {
            return;
        }

        tracing::warn!(
            target: "trove.models",
            coordinate = %coordinate,
            classifier,
            path = %path.display(),
            "resolved model archive is missing; resolving again"
        );
        self.ensure_resolution(coordinate, classifier);
    }

    fn submit(&self, coordinate: ProjectCoordinate, classifier: String) {
        let registry = Arc::clone(&self.registry);
        let index = Arc::clone(&self.index);
        let repository = Arc::clone(&self.repository);
        let progress = self.executor.progress();

        self.executor.execute(Box::new(move || {
            let progress = progress.start(format!("Resolving {classifier} model for {coordinate}"));
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                resolve(&*index, &*repository, &coordinate, &classifier, &progress)
            }));
            let outcome = outcome.unwrap_or_else(|panic| Outcome::Failed {
                resolved: None,
                error: format!(
                    "resolution panicked: {}",
                    panic_payload_to_str(&*panic)
                ),
            });

            registry.transition(&coordinate, &classifier, |status| match outcome {
                Outcome::Resolved(model) => {
                    tracing::info!(
                        target: "trove.models",
                        coordinate = %coordinate,
                        classifier = %classifier,
                        model = %model,
                        "model archive resolved"
                    );
                    status.record_resolved(model);
                }
                Outcome::Failed { resolved, error } => {
                    tracing::warn!(
                        target: "trove.models",
                        coordinate = %coordinate,
                        classifier = %classifier,
                        error = %error,
                        "model resolution failed"
                    );
                    if let Some(model) = resolved {
                        status.set_resolved_coordinate(model);
                    }
                    status.record_failure(error);
                }
            });
            progress.finish(None);
        }));
    }
}

enum Outcome {
    Resolved(ModelCoordinate),
    Failed {
        resolved: Option<ModelCoordinate>,
        error: String,
    },
}

fn resolve(
    index: &dyn ModelIndex,
    repository: &dyn ModelRepository,
    coordinate: &ProjectCoordinate,
    classifier: &str,
    progress: &Progress,
) -> Outcome {
    let Some(model) = index.suggest(coordinate, classifier) else {
        return Outcome::Failed {
            resolved: None,
            error: format!("no {classifier} model archive matches {coordinate}"),
        };
    };

    match repository.resolve(&model, progress) {
        Ok(path) if path.is_file() => Outcome::Resolved(model),
        Ok(path) => Outcome::Failed {
            resolved: Some(model),
            error: format!("file {} does not exist", path.display()),
        },
        Err(err) => Outcome::Failed {
            error: format!("failed to resolve {model}: {err}"),
            resolved: Some(model),
        },
    }
}
