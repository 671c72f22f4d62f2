//! Expiry sweeps and fleet-wide maintenance.
//!
//! A sweep is the one place where individual failures are tolerated: an
//! index entry pointing at content that is already gone is counted and
//! dropped instead of aborting cleanup of everything else.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::primitive::{MaintenancePrimitive, PrimitiveError};
use crate::repository::{is_reserved, validate_artifact_name, RepositoryName};
use crate::store::{ArtifactStore, StoreError};
use crate::ttl_index::TtlIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The repository has no index file; no transaction was opened.
    NoIndex,
    Swept { cleaned: usize, errors: usize },
}

impl SweepOutcome {
    pub fn cleaned(&self) -> usize {
        match self {
            SweepOutcome::NoIndex => 0,
            SweepOutcome::Swept { cleaned, .. } => *cleaned,
        }
    }

    pub fn errors(&self) -> usize {
        match self {
            SweepOutcome::NoIndex => 0,
            SweepOutcome::Swept { errors, .. } => *errors,
        }
    }
}

impl ArtifactStore {
    /// Delete every artifact of `repository` whose expiry is strictly in the
    /// past, in a single transaction.
    pub async fn sweep(&self, repository: &RepositoryName) -> Result<SweepOutcome, StoreError> {
        let access = self.coordinator().acquire().await;
        if !self.root().contains(repository).await {
            return Err(StoreError::RepositoryNotFound(repository.clone()));
        }
        let index_path = TtlIndex::path(&self.root().repository_path(repository));
        let has_index = tokio::fs::metadata(&index_path)
            .await
            .is_ok_and(|metadata| metadata.is_file());
        if !has_index {
            tracing::info!(%repository, "no ttl index, skipping sweep");
            return Ok(SweepOutcome::NoIndex);
        }

        let clock = self.clock().clone();
        let sweep_repository = repository.clone();
        let committed = access
            .transact(repository, move |tx| {
                let repository = sweep_repository;
                let now = clock.now();
                let mut cleaned = 0;
                let mut errors = 0;

                for name in tx.index().expired(now) {
                    if is_reserved(&name) || validate_artifact_name(&name).is_err() {
                        tracing::warn!(%repository, artifact = %name, "dropping ttl entry with unusable name");
                        errors += 1;
                    } else if tx.remove_artifact(&name)? {
                        tracing::debug!(%repository, artifact = %name, "removed expired artifact");
                        cleaned += 1;
                    } else {
                        tracing::warn!(%repository, artifact = %name, "expired artifact is already missing");
                        errors += 1;
                    }
                    tx.index_mut().remove(&name);
                }
                Ok((cleaned, errors))
            })
            .await?;

        let (cleaned, errors) = committed.value;
        tracing::info!(%repository, cleaned, errors, "sweep completed");
        self.notify(repository).await?;
        Ok(SweepOutcome::Swept { cleaned, errors })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HousekeepingError {
    #[error("failed to enumerate repositories under {path}: {source}")]
    Enumerate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("garbage collection failed: {0}")]
    GarbageCollection(#[source] PrimitiveError),
    #[error("re-signing failed: {0}")]
    Resign(#[source] PrimitiveError),
}

#[derive(Debug)]
pub struct HousekeepingReport {
    pub swept: Vec<(RepositoryName, SweepOutcome)>,
    /// Repositories whose sweep failed, with the error. Their failure did
    /// not stop the rest of the run.
    pub failed: Vec<(RepositoryName, StoreError)>,
    pub gc_time: Duration,
    pub elapsed: Duration,
}

impl HousekeepingReport {
    pub fn cleaned(&self) -> usize {
        self.swept.iter().map(|(_, outcome)| outcome.cleaned()).sum()
    }
}

/// Runs periodic maintenance across every repository under the storage
/// root.
#[derive(Debug, Clone)]
pub struct FleetHousekeeper {
    store: ArtifactStore,
    maintenance: Arc<dyn MaintenancePrimitive>,
}

impl FleetHousekeeper {
    pub fn new(store: ArtifactStore, maintenance: Arc<dyn MaintenancePrimitive>) -> Self {
        Self { store, maintenance }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Sweep every repository, then garbage-collect once.
    pub async fn run_all(&self) -> Result<HousekeepingReport, HousekeepingError> {
        let started = Instant::now();
        let root = self.store.root();
        let repositories = root
            .repositories()
            .await
            .map_err(|source| HousekeepingError::Enumerate {
                path: root.path().to_path_buf(),
                source,
            })?;
        tracing::info!(repositories = repositories.len(), "running housekeeping");

        let mut swept = Vec::with_capacity(repositories.len());
        let mut failed = Vec::new();
        for repository in repositories {
            match self.store.sweep(&repository).await {
                Ok(outcome) => swept.push((repository, outcome)),
                Err(e) => {
                    tracing::error!(%repository, error = %e, "sweep failed, continuing with the next repository");
                    failed.push((repository, e));
                }
            }
        }

        let gc_time = self.gc().await?;
        let report = HousekeepingReport {
            swept,
            failed,
            gc_time,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            cleaned = report.cleaned(),
            failed = report.failed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "housekeeping completed"
        );
        Ok(report)
    }

    /// Fleet-wide garbage collection. Holds the global lock so it never runs
    /// while a transaction is open.
    pub async fn gc(&self) -> Result<Duration, HousekeepingError> {
        let _access = self.store.coordinator().acquire().await;
        tracing::info!("running garbage collection");
        let started = Instant::now();
        self.maintenance
            .gc()
            .await
            .map_err(HousekeepingError::GarbageCollection)?;
        let elapsed = started.elapsed();
        tracing::info!(
            elapsed_ms = elapsed.as_millis() as u64,
            "garbage collection completed"
        );
        Ok(elapsed)
    }

    /// Renew repository signatures before they expire.
    pub async fn resign(&self) -> Result<(), HousekeepingError> {
        let _access = self.store.coordinator().acquire().await;
        tracing::info!("re-signing repositories");
        self.maintenance
            .resign()
            .await
            .map_err(HousekeepingError::Resign)
    }
}
