//! The artifact operations exposed to clients.
//!
//! Every mutation goes through the shared [`TransactionCoordinator`] and is
//! followed, once the lock is released, by a change notification. Name and
//! reserved-name checks run before the lock is taken; existence and conflict
//! checks run while it is held, before the transaction opens, so a rejected
//! request never calls into the versioned filesystem.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::coordinator::TransactionCoordinator;
use crate::notifier::{ChangeNotifier, NotifyError};
use crate::primitive::{NotifyPrimitive, TransactionPrimitive};
use crate::repository::{RepositoryName, StorageRoot};
use crate::unpack::ArchiveUnpacker;

mod error;
mod ops;

pub use error::{BuildError, StoreError};
pub use ops::{TtlUpdate, Upload, UploadOutcome};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: StorageRoot,
    coordinator: Arc<TransactionCoordinator>,
    notifier: ChangeNotifier,
    unpacker: Option<Arc<dyn ArchiveUnpacker>>,
    clock: Arc<dyn Clock>,
}

impl ArtifactStore {
    pub fn builder(root: StorageRoot) -> ArtifactStoreBuilder {
        ArtifactStoreBuilder::new(root)
    }

    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    pub fn coordinator(&self) -> &Arc<TransactionCoordinator> {
        &self.coordinator
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn can_unpack(&self) -> bool {
        self.unpacker.is_some()
    }

    /// Announce the current revision of `repository` to subscribers.
    pub async fn notify(&self, repository: &RepositoryName) -> Result<(), StoreError> {
        self.notifier
            .notify(repository)
            .await
            .map_err(|e| match e {
                NotifyError::RepositoryNotFound(repository) => {
                    StoreError::RepositoryNotFound(repository)
                }
                NotifyError::Delivery { repository, source } => {
                    StoreError::Notify { repository, source }
                }
            })
    }
}

pub struct ArtifactStoreBuilder {
    root: StorageRoot,
    transactions: Option<Arc<dyn TransactionPrimitive>>,
    notifications: Option<Arc<dyn NotifyPrimitive>>,
    unpacker: Option<Arc<dyn ArchiveUnpacker>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ArtifactStoreBuilder {
    pub fn new(root: StorageRoot) -> Self {
        Self {
            root,
            transactions: None,
            notifications: None,
            unpacker: None,
            clock: None,
        }
    }

    pub fn transactions(mut self, primitive: Arc<dyn TransactionPrimitive>) -> Self {
        self.transactions = Some(primitive);
        self
    }

    pub fn notifier(mut self, primitive: Arc<dyn NotifyPrimitive>) -> Self {
        self.notifications = Some(primitive);
        self
    }

    pub fn unpacker(mut self, unpacker: Arc<dyn ArchiveUnpacker>) -> Self {
        self.unpacker = Some(unpacker);
        self
    }

    /// Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<ArtifactStore, BuildError> {
        let transactions = self.transactions.ok_or(BuildError::MissingTransactions)?;
        let notifications = self.notifications.ok_or(BuildError::MissingNotifier)?;

        Ok(ArtifactStore {
            coordinator: Arc::new(TransactionCoordinator::new(
                self.root.clone(),
                transactions,
            )),
            notifier: ChangeNotifier::new(self.root.clone(), notifications),
            unpacker: self.unpacker,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            root: self.root,
        })
    }
}
