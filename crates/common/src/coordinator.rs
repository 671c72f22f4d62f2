//! The single critical section every repository mutation runs through.
//!
//! All repositories share one lock: the underlying transaction primitive is
//! not known to be safe with concurrent transactions, even on distinct
//! repositories, so at most one transaction is open fleet-wide at any time.
//! Mutation throughput is therefore serialized; read-only paths never touch
//! the lock.
//!
//! A transaction always runs `begin -> body -> publish`, or
//! `begin -> body fails -> abort`. The lock is released only after publish or
//! abort has returned. Once `begin` succeeds the sequence runs on its own task,
//! so dropping the caller's future cannot leave a transaction open.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::primitive::{PrimitiveError, TransactionPrimitive};
use crate::repository::{RepositoryName, StorageRoot};
use crate::ttl_index::{TtlIndex, TtlIndexError};

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction never opened; nothing ran.
    #[error("failed to begin transaction on {repository}: {source}")]
    Begin {
        repository: RepositoryName,
        #[source]
        source: PrimitiveError,
    },
    /// The body succeeded but the revision could not be published. The
    /// repository is left in a state that needs an operator.
    #[error("failed to publish transaction on {repository}: {source}")]
    Publish {
        repository: RepositoryName,
        #[source]
        source: PrimitiveError,
    },
    /// The body failed and the rollback failed too.
    #[error("failed to abort transaction on {repository}: {source}")]
    Abort {
        repository: RepositoryName,
        #[source]
        source: PrimitiveError,
    },
    /// The body failed and the transaction was aborted. Details are logged,
    /// not carried.
    #[error("operation on {repository} failed and was rolled back")]
    OperationFailed { repository: RepositoryName },
    #[error("transaction task on {repository} did not complete")]
    Interrupted { repository: RepositoryName },
}

impl TransactionError {
    /// Whether the repository may be left with an open or half-published
    /// transaction.
    pub fn needs_operator(&self) -> bool {
        matches!(
            self,
            TransactionError::Publish { .. }
                | TransactionError::Abort { .. }
                | TransactionError::Interrupted { .. }
        )
    }
}

/// The value a transaction body produced, and how long publishing took.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub publish_time: Duration,
}

#[derive(Debug)]
pub struct TransactionCoordinator {
    root: StorageRoot,
    primitive: Arc<dyn TransactionPrimitive>,
    lock: Arc<Mutex<()>>,
}

impl TransactionCoordinator {
    pub fn new(root: StorageRoot, primitive: Arc<dyn TransactionPrimitive>) -> Self {
        Self {
            root,
            primitive,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    /// Wait for the fleet-wide lock. No timeout: a hung primitive stalls
    /// every mutation until it returns.
    pub async fn acquire(&self) -> ExclusiveAccess {
        let guard = self.lock.clone().lock_owned().await;
        ExclusiveAccess {
            guard,
            root: self.root.clone(),
            primitive: self.primitive.clone(),
        }
    }

    /// Acquire the lock and run `operation` inside one transaction on
    /// `repository`.
    pub async fn run_exclusive<T, F>(
        &self,
        repository: &RepositoryName,
        operation: F,
    ) -> Result<Committed<T>, TransactionError>
    where
        F: FnOnce(&mut TransactionContext) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.acquire().await.transact(repository, operation).await
    }
}

/// Proof of holding the fleet-wide lock. Held on its own it serializes
/// non-transactional maintenance (gc, resign) against mutations;
/// [`transact`](Self::transact) spends it on exactly one transaction.
#[derive(Debug)]
pub struct ExclusiveAccess {
    guard: OwnedMutexGuard<()>,
    root: StorageRoot,
    primitive: Arc<dyn TransactionPrimitive>,
}

impl ExclusiveAccess {
    pub async fn transact<T, F>(
        self,
        repository: &RepositoryName,
        operation: F,
    ) -> Result<Committed<T>, TransactionError>
    where
        F: FnOnce(&mut TransactionContext) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::spawn(run_transaction(self, repository.clone(), operation));
        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(%repository, error = %e, "transaction task did not complete");
                Err(TransactionError::Interrupted {
                    repository: repository.clone(),
                })
            }
        }
    }
}

async fn run_transaction<T, F>(
    access: ExclusiveAccess,
    repository: RepositoryName,
    operation: F,
) -> Result<Committed<T>, TransactionError>
where
    F: FnOnce(&mut TransactionContext) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    // the guard lives until this function returns, i.e. after publish or abort
    let ExclusiveAccess {
        guard: _guard,
        root,
        primitive,
    } = access;

    let started = Instant::now();
    if let Err(source) = primitive.begin(&repository).await {
        tracing::error!(%repository, error = %source, "failed to begin transaction");
        return Err(TransactionError::Begin { repository, source });
    }
    tracing::debug!(
        %repository,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "transaction opened"
    );

    let path = root.repository_path(&repository);
    let body = tokio::task::spawn_blocking(move || -> anyhow::Result<T> {
        let mut context = TransactionContext::open(path)?;
        let value = operation(&mut context)?;
        context.finish()?;
        Ok(value)
    })
    .await;
    let result = match body {
        Ok(result) => result,
        Err(e) => Err(anyhow::anyhow!("transaction body did not complete: {e}")),
    };

    match result {
        Ok(value) => {
            let publish_started = Instant::now();
            if let Err(source) = primitive.publish(&repository).await {
                tracing::error!(
                    %repository,
                    error = %source,
                    "failed to publish transaction, repository needs operator attention"
                );
                return Err(TransactionError::Publish { repository, source });
            }
            let publish_time = publish_started.elapsed();
            tracing::info!(
                %repository,
                publish_ms = publish_time.as_millis() as u64,
                "transaction published"
            );
            Ok(Committed {
                value,
                publish_time,
            })
        }
        Err(error) => {
            tracing::error!(%repository, error = ?error, "transaction body failed, aborting");
            if let Err(source) = primitive.abort(&repository, true).await {
                tracing::error!(
                    %repository,
                    error = %source,
                    "failed to abort transaction, repository needs operator attention"
                );
                return Err(TransactionError::Abort { repository, source });
            }
            tracing::info!(%repository, "transaction aborted");
            Err(TransactionError::OperationFailed { repository })
        }
    }
}

/// Mutable access to one repository's working tree and TTL index for the
/// duration of a transaction body.
///
/// The index is read when the body starts and written back after it returns
/// successfully, but only if the body asked for mutable access to it.
#[derive(Debug)]
pub struct TransactionContext {
    path: PathBuf,
    index: TtlIndex,
    index_touched: bool,
}

impl TransactionContext {
    fn open(path: PathBuf) -> Result<Self, TtlIndexError> {
        let index = TtlIndex::load(&path)?;
        Ok(Self {
            path,
            index,
            index_touched: false,
        })
    }

    fn finish(self) -> Result<(), TtlIndexError> {
        if self.index_touched {
            self.index.save(&self.path)?;
        }
        Ok(())
    }

    pub fn repository_path(&self) -> &Path {
        &self.path
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn index(&self) -> &TtlIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut TtlIndex {
        self.index_touched = true;
        &mut self.index
    }

    /// Whether anything (file, directory or link) exists at `name`.
    pub fn artifact_exists(&self, name: &str) -> bool {
        self.artifact_path(name).symlink_metadata().is_ok()
    }

    /// Remove the file or directory tree at `name`. Returns `false` if there
    /// was nothing to remove.
    pub fn remove_artifact(&self, name: &str) -> io::Result<bool> {
        let path = self.artifact_path(name);
        let metadata = match path.symlink_metadata() {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        if metadata.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
        Ok(true)
    }

    pub fn write_artifact(&self, name: &str, contents: &[u8]) -> io::Result<()> {
        std::fs::write(self.artifact_path(name), contents)
    }
}
