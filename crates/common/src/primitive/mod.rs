//! Narrow interfaces over the external versioned filesystem.
//!
//! Every call is slow (hundreds of milliseconds to seconds), side-effecting
//! and independently fallible. Nothing here retries: a failure is terminal
//! for the call that produced it.
//!
//! Only the [`TransactionCoordinator`](crate::coordinator::TransactionCoordinator)
//! may call [`TransactionPrimitive`] methods.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::repository::RepositoryName;

mod cvmfs;
mod local;

pub use cvmfs::{CvmfsServer, CvmfsServerConfig};
pub use local::LocalTransactions;

#[derive(Debug, thiserror::Error)]
pub enum PrimitiveError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("{0}")]
    Rejected(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Begin / publish / abort on a single repository.
#[async_trait]
pub trait TransactionPrimitive: Send + Sync + Debug + 'static {
    /// Open a writable transaction on the repository.
    async fn begin(&self, repository: &RepositoryName) -> Result<(), PrimitiveError>;

    /// Publish the open transaction as a new revision.
    async fn publish(&self, repository: &RepositoryName) -> Result<(), PrimitiveError>;

    /// Discard the open transaction, restoring the last published revision.
    async fn abort(&self, repository: &RepositoryName, force: bool) -> Result<(), PrimitiveError>;
}

/// Fleet-wide maintenance that is not scoped to one repository.
#[async_trait]
pub trait MaintenancePrimitive: Send + Sync + Debug + 'static {
    /// Garbage-collect unreferenced objects across every repository.
    async fn gc(&self) -> Result<(), PrimitiveError>;

    /// Renew the repository whitelist signatures before they expire.
    async fn resign(&self) -> Result<(), PrimitiveError>;
}

/// Tell downstream caches and replicas that a new revision exists.
#[async_trait]
pub trait NotifyPrimitive: Send + Sync + Debug + 'static {
    async fn notify(&self, repository: &RepositoryName) -> Result<(), PrimitiveError>;
}
