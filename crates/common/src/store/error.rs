use crate::coordinator::TransactionError;
use crate::primitive::PrimitiveError;
use crate::repository::{NameError, RepositoryName};
use crate::ttl_index::TtlIndexError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),
    #[error("`{0}` is reserved and cannot be used as an artifact name")]
    Forbidden(String),
    #[error("repository {0} does not exist")]
    RepositoryNotFound(RepositoryName),
    #[error("artifact `{artifact}` does not exist in repository {repository}")]
    ArtifactNotFound {
        repository: RepositoryName,
        artifact: String,
    },
    #[error("artifact `{artifact}` already exists in repository {repository}")]
    Conflict {
        repository: RepositoryName,
        artifact: String,
    },
    #[error("artifact `{artifact}` in repository {repository} is a directory")]
    IsDirectory {
        repository: RepositoryName,
        artifact: String,
    },
    #[error("archive unpacking is not configured")]
    UnpackUnavailable,
    #[error("ttl of {0}s is out of range")]
    InvalidTtl(i64),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// The change was published; only telling subscribers about it failed.
    #[error("published, but failed to notify subscribers of {repository}: {source}")]
    Notify {
        repository: RepositoryName,
        #[source]
        source: PrimitiveError,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Index(#[from] TtlIndexError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::RepositoryNotFound(_) | StoreError::ArtifactNotFound { .. }
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no transaction primitive configured")]
    MissingTransactions,
    #[error("no notification primitive configured")]
    MissingNotifier,
}
