#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tempfile::TempDir;
use walkdir::WalkDir;

use ::common::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Begin(String),
    Publish(String),
    Abort(String),
    Notify(String),
    Gc,
    Resign,
}

/// Local snapshot transactions with an event log and switchable faults.
#[derive(Debug)]
pub struct RecordingBackend {
    inner: LocalTransactions,
    events: Mutex<Vec<(Event, Instant)>>,
    pub fail_begin: AtomicBool,
    pub fail_publish: AtomicBool,
    pub fail_notify: AtomicBool,
    pub fail_gc: AtomicBool,
    /// Slept inside begin and publish to widen the open-transaction window.
    pub delay: Mutex<Option<Duration>>,
}

impl RecordingBackend {
    pub fn new(root: StorageRoot) -> Self {
        Self {
            inner: LocalTransactions::new(root).unwrap(),
            events: Mutex::new(Vec::new()),
            fail_begin: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
            fail_notify: AtomicBool::new(false),
            fail_gc: AtomicBool::new(false),
            delay: Mutex::new(None),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn timed_events(&self) -> Vec<(Event, Instant)> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|(e, _)| matches(e)).count()
    }

    fn record(&self, event: Event) {
        self.events.lock().push((event, Instant::now()));
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn injected(what: &str) -> PrimitiveError {
    PrimitiveError::Rejected(format!("injected {what} failure"))
}

#[async_trait]
impl TransactionPrimitive for RecordingBackend {
    async fn begin(&self, repository: &RepositoryName) -> Result<(), PrimitiveError> {
        if self.fail_begin.load(Ordering::SeqCst) {
            return Err(injected("begin"));
        }
        self.inner.begin(repository).await?;
        self.record(Event::Begin(repository.to_string()));
        self.pause().await;
        Ok(())
    }

    async fn publish(&self, repository: &RepositoryName) -> Result<(), PrimitiveError> {
        self.pause().await;
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(injected("publish"));
        }
        self.record(Event::Publish(repository.to_string()));
        self.inner.publish(repository).await
    }

    async fn abort(&self, repository: &RepositoryName, force: bool) -> Result<(), PrimitiveError> {
        self.record(Event::Abort(repository.to_string()));
        self.inner.abort(repository, force).await
    }
}

#[async_trait]
impl MaintenancePrimitive for RecordingBackend {
    async fn gc(&self) -> Result<(), PrimitiveError> {
        if self.fail_gc.load(Ordering::SeqCst) {
            return Err(injected("gc"));
        }
        self.record(Event::Gc);
        Ok(())
    }

    async fn resign(&self) -> Result<(), PrimitiveError> {
        self.record(Event::Resign);
        Ok(())
    }
}

#[async_trait]
impl NotifyPrimitive for RecordingBackend {
    async fn notify(&self, repository: &RepositoryName) -> Result<(), PrimitiveError> {
        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(injected("notify"));
        }
        self.record(Event::Notify(repository.to_string()));
        Ok(())
    }
}

/// Writes a partial tree, then fails.
#[derive(Debug)]
pub struct FailingUnpacker;

impl ArchiveUnpacker for FailingUnpacker {
    fn unpack(&self, _archive: &Path, destination: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(destination)?;
        std::fs::write(destination.join("half-a-layer"), b"partial")?;
        anyhow::bail!("archive is truncated")
    }
}

/// Expands an archive into `<destination>/layer` holding the archive bytes.
#[derive(Debug)]
pub struct DirUnpacker;

impl ArchiveUnpacker for DirUnpacker {
    fn unpack(&self, archive: &Path, destination: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(destination)?;
        std::fs::copy(archive, destination.join("layer"))?;
        Ok(())
    }
}

pub const REPO: &str = "unstable.cvmfs.example.org";
pub const OTHER_REPO: &str = "stable.cvmfs.example.org";

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub struct TestEnv {
    pub dir: TempDir,
    pub root: StorageRoot,
    pub backend: Arc<RecordingBackend>,
    pub clock: FixedClock,
    pub store: ArtifactStore,
}

impl TestEnv {
    pub fn repo(&self) -> RepositoryName {
        RepositoryName::parse(REPO).unwrap()
    }

    pub fn other_repo(&self) -> RepositoryName {
        RepositoryName::parse(OTHER_REPO).unwrap()
    }

    pub fn repo_path(&self, repository: &RepositoryName) -> std::path::PathBuf {
        self.root.repository_path(repository)
    }

    pub fn housekeeper(&self) -> FleetHousekeeper {
        FleetHousekeeper::new(self.store.clone(), self.backend.clone())
    }
}

/// Storage root with [`REPO`] and [`OTHER_REPO`] provisioned, a fixed clock
/// at t=1_000_000 and no unpacker.
pub fn setup_test_env() -> TestEnv {
    setup_with_unpacker(None)
}

/// Route store logs to the test harness; set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn setup_with_unpacker(unpacker: Option<Arc<dyn ArchiveUnpacker>>) -> TestEnv {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let root = StorageRoot::new(dir.path());
    std::fs::create_dir(dir.path().join(REPO)).unwrap();
    std::fs::create_dir(dir.path().join(OTHER_REPO)).unwrap();

    let backend = Arc::new(RecordingBackend::new(root.clone()));
    let clock = FixedClock::new(at(1_000_000));
    let mut builder = ArtifactStore::builder(root.clone())
        .transactions(backend.clone())
        .notifier(backend.clone())
        .clock(Arc::new(clock.clone()));
    if let Some(unpacker) = unpacker {
        builder = builder.unpacker(unpacker);
    }
    let store = builder.build().unwrap();

    TestEnv {
        dir,
        root,
        backend,
        clock,
        store,
    }
}

/// Every file under `path`, relative path to contents.
pub fn snapshot(path: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(path)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(path)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            (relative, std::fs::read(entry.path()).unwrap())
        })
        .collect()
}
