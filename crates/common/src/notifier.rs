use std::sync::Arc;

use crate::primitive::{NotifyPrimitive, PrimitiveError};
use crate::repository::{RepositoryName, StorageRoot};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("repository {0} does not exist")]
    RepositoryNotFound(RepositoryName),
    #[error("failed to notify subscribers of {repository}: {source}")]
    Delivery {
        repository: RepositoryName,
        #[source]
        source: PrimitiveError,
    },
}

/// Announces new revisions to downstream caches and replicas.
///
/// A failed notification never rolls anything back: by the time it runs the
/// revision is already published.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    root: StorageRoot,
    primitive: Arc<dyn NotifyPrimitive>,
}

impl ChangeNotifier {
    pub fn new(root: StorageRoot, primitive: Arc<dyn NotifyPrimitive>) -> Self {
        Self { root, primitive }
    }

    pub async fn notify(&self, repository: &RepositoryName) -> Result<(), NotifyError> {
        if !self.root.contains(repository).await {
            return Err(NotifyError::RepositoryNotFound(repository.clone()));
        }

        tracing::info!(%repository, "notifying subscribers of new revision");
        self.primitive
            .notify(repository)
            .await
            .map_err(|source| {
                tracing::warn!(%repository, error = %source, "notification failed");
                NotifyError::Delivery {
                    repository: repository.clone(),
                    source,
                }
            })
    }
}
