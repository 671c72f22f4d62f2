//! A stand-in for the versioned filesystem, for development machines and
//! tests.
//!
//! `begin` copies the repository directory into a scratch snapshot,
//! `publish` discards the snapshot and `abort` restores it. Readers see the
//! working tree directly, so there is no isolation; only the rollback
//! semantics of a real transaction are reproduced.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use walkdir::WalkDir;

use super::{MaintenancePrimitive, NotifyPrimitive, PrimitiveError, TransactionPrimitive};
use crate::repository::{RepositoryName, StorageRoot};

#[derive(Debug)]
pub struct LocalTransactions {
    root: StorageRoot,
    scratch: tempfile::TempDir,
    open: Mutex<HashMap<RepositoryName, PathBuf>>,
}

impl LocalTransactions {
    pub fn new(root: StorageRoot) -> io::Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("ephemeral-snapshots-")
            .tempdir()?;
        Ok(Self {
            root,
            scratch,
            open: Mutex::new(HashMap::new()),
        })
    }

    pub fn is_open(&self, repository: &RepositoryName) -> bool {
        self.open.lock().contains_key(repository)
    }
}

#[async_trait]
impl TransactionPrimitive for LocalTransactions {
    async fn begin(&self, repository: &RepositoryName) -> Result<(), PrimitiveError> {
        let source = self.root.repository_path(repository);
        if !source.is_dir() {
            return Err(PrimitiveError::Rejected(format!(
                "repository {repository} does not exist"
            )));
        }

        let snapshot = self.scratch.path().join(repository.as_str());
        {
            let mut open = self.open.lock();
            if open.contains_key(repository) {
                return Err(PrimitiveError::Rejected(format!(
                    "a transaction is already open on {repository}"
                )));
            }
            open.insert(repository.clone(), snapshot.clone());
        }

        let copied = blocking(move || {
            if snapshot.exists() {
                fs::remove_dir_all(&snapshot)?;
            }
            copy_tree(&source, &snapshot)
        })
        .await;

        if let Err(e) = copied {
            self.open.lock().remove(repository);
            return Err(e.into());
        }
        tracing::debug!(%repository, "local transaction opened");
        Ok(())
    }

    async fn publish(&self, repository: &RepositoryName) -> Result<(), PrimitiveError> {
        let snapshot = self.open.lock().remove(repository).ok_or_else(|| {
            PrimitiveError::Rejected(format!("no transaction is open on {repository}"))
        })?;
        blocking(move || fs::remove_dir_all(&snapshot)).await?;
        tracing::debug!(%repository, "local transaction published");
        Ok(())
    }

    async fn abort(&self, repository: &RepositoryName, force: bool) -> Result<(), PrimitiveError> {
        let Some(snapshot) = self.open.lock().remove(repository) else {
            if force {
                return Ok(());
            }
            return Err(PrimitiveError::Rejected(format!(
                "no transaction is open on {repository}"
            )));
        };

        let target = self.root.repository_path(repository);
        blocking(move || {
            if target.exists() {
                fs::remove_dir_all(&target)?;
            }
            copy_tree(&snapshot, &target)?;
            fs::remove_dir_all(&snapshot)
        })
        .await?;
        tracing::debug!(%repository, "local transaction aborted");
        Ok(())
    }
}

#[async_trait]
impl MaintenancePrimitive for LocalTransactions {
    async fn gc(&self) -> Result<(), PrimitiveError> {
        tracing::info!("local backend keeps no revisions, nothing to collect");
        Ok(())
    }

    async fn resign(&self) -> Result<(), PrimitiveError> {
        tracing::info!("local backend has no signatures to renew");
        Ok(())
    }
}

#[async_trait]
impl NotifyPrimitive for LocalTransactions {
    async fn notify(&self, repository: &RepositoryName) -> Result<(), PrimitiveError> {
        tracing::debug!(%repository, "local backend has no subscribers to notify");
        Ok(())
    }
}

async fn blocking<F>(f: F) -> io::Result<()>
where
    F: FnOnce() -> io::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(io::Error::other)?
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let target = to.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            #[cfg(unix)]
            std::os::unix::fs::symlink(fs::read_link(entry.path())?, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
