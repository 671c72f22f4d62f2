use std::sync::Arc;

use common::prelude::*;

use crate::service_config::{BackendConfig, Config};

/// Shared state handed to every request handler and scheduled job.
#[derive(Debug, Clone)]
pub struct State {
    store: ArtifactStore,
    housekeeper: FleetHousekeeper,
    config: Arc<Config>,
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("storage root {0} is not a directory")]
    StorageRootMissing(std::path::PathBuf),
    #[error("failed to set up local backend: {0}")]
    LocalBackend(#[source] std::io::Error),
    #[error("failed to build artifact store: {0}")]
    Store(#[from] BuildError),
}

impl State {
    pub fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        if !config.storage_root.is_dir() {
            return Err(StateSetupError::StorageRootMissing(
                config.storage_root.clone(),
            ));
        }
        let root = StorageRoot::new(&config.storage_root);

        match &config.backend {
            BackendConfig::Cvmfs(cvmfs) => {
                tracing::info!(
                    storage_root = %config.storage_root.display(),
                    server_bin = %cvmfs.server_bin,
                    "using cvmfs_server backend"
                );
                let backend = Arc::new(CvmfsServer::new(cvmfs.clone()));
                Self::with_backend(config, root, backend)
            }
            BackendConfig::Local => {
                tracing::warn!(
                    storage_root = %config.storage_root.display(),
                    "using local snapshot backend, not for production"
                );
                let backend = Arc::new(
                    LocalTransactions::new(root.clone()).map_err(StateSetupError::LocalBackend)?,
                );
                Self::with_backend(config, root, backend)
            }
        }
    }

    /// Wire the store and housekeeper around a single backend that provides
    /// every primitive.
    pub fn with_backend<B>(
        config: &Config,
        root: StorageRoot,
        backend: Arc<B>,
    ) -> Result<Self, StateSetupError>
    where
        B: TransactionPrimitive + MaintenancePrimitive + NotifyPrimitive,
    {
        let mut builder = ArtifactStore::builder(root)
            .transactions(backend.clone())
            .notifier(backend.clone());
        if let Some(unpacker) = config
            .unpack_command
            .as_deref()
            .and_then(CommandUnpacker::from_argv)
        {
            tracing::info!(?unpacker, "archive unpacking enabled");
            builder = builder.unpacker(Arc::new(unpacker));
        }
        let store = builder.build()?;
        let housekeeper = FleetHousekeeper::new(store.clone(), backend);

        Ok(Self {
            store,
            housekeeper,
            config: Arc::new(config.clone()),
        })
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn housekeeper(&self) -> &FleetHousekeeper {
        &self.housekeeper
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
