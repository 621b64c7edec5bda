use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::time::{Duration, SystemTime};

use trove_archive::{ArchiveError, ModelLoader};
use trove_coordinates::{
    AdvisorChain, CoordinateRegistry, ModelCoordinate, ProjectCoordinate,
};
use trove_models::{
    ArchiveStatus, ArchiveStatusRegistry, LocatedKey, ModelContext, ModelStore, ModelsError,
};
use trove_repository::{
    IndexEntry, JsonModelIndex, LocalRepository, ModelIndex, ModelRepository, RepositoryError,
};
use trove_scheduler::{ManualExecutor, Progress};
use zip::write::SimpleFileOptions;

const LIST: &str = "java/util/List";

struct CallsLoader;

impl ModelLoader<Vec<String>> for CallsLoader {
    fn prefix(&self) -> &str {
        "calls"
    }

    fn load(&self, _key: &str, bytes: &[u8]) -> anyhow::Result<Vec<String>> {
        Ok(std::str::from_utf8(bytes)?
            .split_whitespace()
            .map(str::to_owned)
            .collect())
    }
}

struct UnreachableRepository;

impl ModelRepository for UnreachableRepository {
    fn location(&self, coordinate: &ModelCoordinate) -> PathBuf {
        PathBuf::from("/nonexistent").join(coordinate.repository_path())
    }

    fn resolve(
        &self,
        _coordinate: &ModelCoordinate,
        _progress: &Progress,
    ) -> Result<PathBuf, RepositoryError> {
        Err(RepositoryError::Http {
            message: "connection refused".to_owned(),
        })
    }
}

struct PanickingIndex;

impl ModelIndex for PanickingIndex {
    fn suggest(&self, _project: &ProjectCoordinate, _classifier: &str) -> Option<ModelCoordinate> {
        panic!("index exploded");
    }
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn write_library_jar(path: &Path) {
    write_zip(
        path,
        &[(
            "META-INF/maven/org.example/lib/pom.properties",
            "groupId=org.example\nartifactId=lib\nversion=1.0\n",
        )],
    );
}

fn lib_coordinate() -> ProjectCoordinate {
    "org.example:lib:1.0".parse().unwrap()
}

fn calls_model() -> ModelCoordinate {
    "org.example:calls-model:zip:calls:1.0".parse().unwrap()
}

fn index_with_calls_model() -> Arc<JsonModelIndex> {
    Arc::new(JsonModelIndex::from_entries(vec![IndexEntry {
        coordinate: lib_coordinate(),
        fingerprints: Vec::new(),
        models: BTreeMap::from([("calls".to_owned(), calls_model())]),
    }]))
}

struct Harness {
    dir: tempfile::TempDir,
    jar: PathBuf,
    repository: Arc<LocalRepository>,
    executor: Arc<ManualExecutor>,
    context: ModelContext,
    store: ModelStore<LocatedKey, Vec<String>>,
}

impl Harness {
    fn new(index: Arc<dyn ModelIndex>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(LocalRepository::new(dir.path().join("repository")));
        Self::with_repository(dir, index, repository.clone(), repository)
    }

    fn with_repository(
        dir: tempfile::TempDir,
        index: Arc<dyn ModelIndex>,
        local: Arc<LocalRepository>,
        repository: Arc<dyn ModelRepository>,
    ) -> Self {
        let jar = dir.path().join("lib.jar");
        write_library_jar(&jar);

        let executor = Arc::new(ManualExecutor::new());
        let context = ModelContext::from_parts(
            Arc::new(CoordinateRegistry::open(dir.path().join("coordinates.json"))),
            Arc::new(AdvisorChain::with_defaults()),
            Arc::new(ArchiveStatusRegistry::open(dir.path().join("archives.json"))),
            index,
            repository,
            executor.clone(),
            2,
        );
        let store = context.store("calls", Arc::new(CallsLoader));
        Self {
            dir,
            jar,
            repository: local,
            executor,
            context,
            store,
        }
    }

    fn key(&self, name: &str) -> LocatedKey {
        LocatedKey::new(&self.jar, name)
    }

    fn status(&self) -> ArchiveStatus {
        self.context
            .resolver()
            .registry()
            .get(&lib_coordinate(), "calls")
            .unwrap()
            .download_status()
    }

    fn install_model_archive(&self) -> PathBuf {
        let path = self.repository.location(&calls_model());
        write_zip(&path, &[("calls-java.util.List.json", "add get size")]);
        path
    }
}

#[test]
fn first_acquire_schedules_download_and_returns_none() {
    let harness = Harness::new(index_with_calls_model());

    assert!(harness.store.acquire(&harness.key(LIST)).is_none());
    assert_eq!(harness.status(), ArchiveStatus::Downloading);
    assert_eq!(harness.executor.pending(), 1);

    // Still in flight: no second job.
    assert!(harness.store.acquire(&harness.key(LIST)).is_none());
    assert_eq!(harness.executor.pending(), 1);
}

#[test]
fn resolved_archive_serves_present_keys_only() {
    let harness = Harness::new(index_with_calls_model());
    harness.install_model_archive();

    assert!(harness.store.acquire(&harness.key(LIST)).is_none());
    assert_eq!(harness.executor.run_all(), 1);
    assert_eq!(harness.status(), ArchiveStatus::Resolved);

    let model = harness.store.acquire(&harness.key(LIST)).unwrap();
    assert_eq!(*model, vec!["add", "get", "size"]);
    assert!(harness.store.acquire(&harness.key("java/util/Set")).is_none());
    assert!(harness.store.has_model(&harness.key(LIST)));
    harness.store.release(model);
    assert_eq!(harness.executor.pending(), 0);
}

#[test]
fn unmatched_coordinate_fails_and_survives_reload() {
    let harness = Harness::new(Arc::new(JsonModelIndex::default()));

    assert!(harness.store.acquire(&harness.key(LIST)).is_none());
    harness.executor.run_all();
    assert_eq!(harness.status(), ArchiveStatus::Failed);
    assert!(harness.store.acquire(&harness.key(LIST)).is_none());
    assert_eq!(harness.executor.pending(), 0);

    let failed = harness.store.statuses();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].errors().len(), 1);
    harness.store.close().unwrap();

    let reloaded = ArchiveStatusRegistry::open(harness.dir.path().join("archives.json"));
    let status = reloaded.get(&lib_coordinate(), "calls").unwrap();
    assert_eq!(status.download_status(), ArchiveStatus::Failed);
    assert_eq!(status.errors(), failed[0].errors());
}

#[test]
fn replaced_dependency_needs_rediscovery() {
    let harness = Harness::new(index_with_calls_model());
    let coordinates = harness.context.coordinates();

    harness.store.acquire(&harness.key(LIST));
    assert_eq!(coordinates.lookup(&harness.jar), Some(lib_coordinate()));

    let file = std::fs::File::options()
        .write(true)
        .open(&harness.jar)
        .unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();
    drop(file);
    assert_eq!(coordinates.lookup(&harness.jar), None);

    harness.store.acquire(&harness.key(LIST));
    assert_eq!(coordinates.lookup(&harness.jar), Some(lib_coordinate()));
}

#[test]
fn concurrent_first_lookups_schedule_one_job() {
    let harness = Harness::new(index_with_calls_model());
    let threads = 8;
    let barrier = Barrier::new(threads);

    std::thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                barrier.wait();
                assert!(harness.store.acquire(&harness.key(LIST)).is_none());
            });
        }
    });

    assert_eq!(harness.executor.pending(), 1);
    assert_eq!(harness.status(), ArchiveStatus::Downloading);
}

#[test]
fn archive_with_acquired_models_is_not_evicted() {
    let harness = Harness::new(index_with_calls_model());
    harness.install_model_archive();
    harness.store.acquire(&harness.key(LIST));
    harness.executor.run_all();

    let first = harness.store.acquire(&harness.key(LIST)).unwrap();
    let second = harness.store.acquire(&harness.key(LIST)).unwrap();

    harness.store.release(first);
    match harness.store.evict(&lib_coordinate()) {
        Err(ModelsError::Archive(ArchiveError::InUse { outstanding, .. })) => {
            assert_eq!(outstanding, 1)
        }
        other => panic!("expected InUse, got {other:?}"),
    }

    harness.store.release(second);
    assert!(harness.store.evict(&lib_coordinate()).unwrap());
    assert!(!harness.store.evict(&lib_coordinate()).unwrap());

    // A fresh archive is attached on the next acquire.
    let again = harness.store.acquire(&harness.key(LIST)).unwrap();
    harness.store.release(again);
}

#[test]
fn unresolved_archive_behaves_like_the_null_archive() {
    let harness = Harness::new(index_with_calls_model());

    let archive = harness.store.archive_for(&lib_coordinate());
    for key in [LIST, "java/util/Map", ""] {
        assert!(!archive.has_model(key));
        assert!(archive.acquire_model(key).is_none());
    }
    assert_eq!(harness.status(), ArchiveStatus::Downloading);
}

#[test]
fn vanished_archive_file_is_resolved_again() {
    let harness = Harness::new(index_with_calls_model());
    let path = harness.install_model_archive();
    harness.store.acquire(&harness.key(LIST));
    harness.executor.run_all();
    assert_eq!(harness.status(), ArchiveStatus::Resolved);

    std::fs::remove_file(&path).unwrap();
    assert!(harness.store.acquire(&harness.key(LIST)).is_none());
    assert_eq!(harness.status(), ArchiveStatus::Downloading);
    assert_eq!(harness.executor.pending(), 1);

    // Another lookup while the job is queued does not add a second one.
    assert!(harness.store.acquire(&harness.key(LIST)).is_none());
    assert_eq!(harness.executor.pending(), 1);

    // Persisted state is never FAILED, so a restart retries as well.
    harness.store.close().unwrap();
    let reloaded = ArchiveStatusRegistry::open(harness.dir.path().join("archives.json"));
    let persisted = reloaded.get(&lib_coordinate(), "calls").unwrap();
    assert_eq!(persisted.download_status(), ArchiveStatus::Unresolved);
    assert!(persisted.errors().is_empty());

    harness.install_model_archive();
    assert_eq!(harness.executor.run_all(), 1);
    assert_eq!(harness.status(), ArchiveStatus::Resolved);
    let model = harness.store.acquire(&harness.key(LIST)).unwrap();
    harness.store.release(model);
}

#[test]
fn missing_download_fails_then_reresolves_on_request() {
    let harness = Harness::new(index_with_calls_model());

    harness.store.acquire(&harness.key(LIST));
    harness.executor.run_all();
    assert_eq!(harness.status(), ArchiveStatus::Failed);

    let resolver = harness.context.resolver();
    assert!(!resolver.request_reresolution(&lib_coordinate(), "overrides"));
    assert!(resolver.registry().get(&lib_coordinate(), "overrides").is_none());
    assert!(resolver.request_reresolution(&lib_coordinate(), "calls"));
    assert_eq!(harness.status(), ArchiveStatus::Unresolved);

    harness.install_model_archive();
    assert!(harness.store.acquire(&harness.key(LIST)).is_none());
    assert_eq!(harness.executor.run_all(), 1);
    assert_eq!(harness.status(), ArchiveStatus::Resolved);

    let status = harness.store.statuses().remove(0);
    assert_eq!(status.errors().len(), 1);
    let model = harness.store.acquire(&harness.key(LIST)).unwrap();
    harness.store.release(model);
}

#[test]
fn close_reports_registry_write_failures() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("cache");
    std::fs::write(&blocker, b"").unwrap();

    let context = ModelContext::from_parts(
        Arc::new(CoordinateRegistry::open(dir.path().join("coordinates.json"))),
        Arc::new(AdvisorChain::with_defaults()),
        Arc::new(ArchiveStatusRegistry::open(blocker.join("archives.json"))),
        index_with_calls_model(),
        Arc::new(LocalRepository::new(dir.path().join("repository"))),
        Arc::new(ManualExecutor::new()),
        2,
    );
    let store: ModelStore<LocatedKey, Vec<String>> = context.store("calls", Arc::new(CallsLoader));
    store.archive_for(&lib_coordinate());

    assert!(store.close().is_err());
    assert!(context.close().is_err());
}

#[test]
fn repository_errors_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let local = Arc::new(LocalRepository::new(dir.path().join("repository")));
    let harness = Harness::with_repository(
        dir,
        index_with_calls_model(),
        local,
        Arc::new(UnreachableRepository),
    );

    harness.store.acquire(&harness.key(LIST));
    harness.executor.run_all();

    let status = harness.store.statuses().remove(0);
    assert_eq!(status.download_status(), ArchiveStatus::Failed);
    assert!(status.errors()[0].contains("connection refused"));
    assert_eq!(status.resolved_coordinate(), Some(&calls_model()));
}

#[test]
fn panicking_resolution_is_recorded_as_failure() {
    let harness = Harness::new(Arc::new(PanickingIndex));

    harness.store.acquire(&harness.key(LIST));
    harness.executor.run_all();

    let status = harness.store.statuses().remove(0);
    assert_eq!(status.download_status(), ArchiveStatus::Failed);
    assert!(status.errors()[0].contains("index exploded"));
}

#[test]
fn unrooted_keys_resolve_to_nothing() {
    let harness = Harness::new(index_with_calls_model());

    assert!(harness.store.acquire(&LocatedKey::unrooted(LIST)).is_none());
    assert!(!harness.store.has_model(&LocatedKey::unrooted(LIST)));
    assert_eq!(harness.executor.pending(), 0);
    assert!(harness.store.statuses().is_empty());
}
