use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};

use super::{ArtifactStore, StoreError};
use crate::repository::{is_reserved, validate_artifact_name, RepositoryName};
use crate::ttl_index::TtlRecord;
use crate::unpack::unpack_bytes;

/// A single artifact upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub content: Bytes,
    pub ttl_s: i64,
    /// Replace an existing artifact of the same name.
    pub overwrite: bool,
    /// Treat `content` as an archive and expand it into a directory.
    pub unpack: bool,
}

impl Upload {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>, ttl_s: i64) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ttl_s,
            overwrite: false,
            unpack: false,
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn unpack(mut self, unpack: bool) -> Self {
        self.unpack = unpack;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub name: String,
    pub expires_at: DateTime<Utc>,
    /// Time spent writing (or unpacking) the content.
    pub upload_time: Duration,
    pub publish_time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtlUpdate {
    pub name: String,
    pub ttl_s: i64,
    pub expires_at: DateTime<Utc>,
}

/// Checks shared by every operation that targets a single artifact. The
/// reserved-name check comes first so it wins over every other failure.
fn check_artifact_name(name: &str) -> Result<(), StoreError> {
    if is_reserved(name) {
        return Err(StoreError::Forbidden(name.to_string()));
    }
    validate_artifact_name(name)?;
    Ok(())
}

fn expiry(now: DateTime<Utc>, ttl: TimeDelta) -> anyhow::Result<DateTime<Utc>> {
    now.checked_add_signed(ttl)
        .context("expiry timestamp out of range")
}

impl ArtifactStore {
    /// The TTL as a duration, provided `now + ttl_s` is a representable
    /// timestamp. The expiry itself is recomputed inside the transaction.
    fn checked_ttl(&self, ttl_s: i64) -> Result<TimeDelta, StoreError> {
        TimeDelta::try_seconds(ttl_s)
            .filter(|ttl| self.clock.now().checked_add_signed(*ttl).is_some())
            .ok_or(StoreError::InvalidTtl(ttl_s))
    }

    async fn require_repository(&self, repository: &RepositoryName) -> Result<(), StoreError> {
        if !self.root.contains(repository).await {
            return Err(StoreError::RepositoryNotFound(repository.clone()));
        }
        Ok(())
    }

    /// Whether anything, including a dangling link, occupies the artifact's
    /// path.
    async fn artifact_exists(&self, repository: &RepositoryName, name: &str) -> bool {
        tokio::fs::symlink_metadata(self.artifact_path(repository, name))
            .await
            .is_ok()
    }

    fn artifact_path(&self, repository: &RepositoryName, name: &str) -> PathBuf {
        self.root.repository_path(repository).join(name)
    }

    /// Write a new artifact, or replace an existing one when
    /// `upload.overwrite` is set, and record its expiry.
    pub async fn upload(
        &self,
        repository: &RepositoryName,
        upload: Upload,
    ) -> Result<UploadOutcome, StoreError> {
        check_artifact_name(&upload.name)?;
        let ttl = self.checked_ttl(upload.ttl_s)?;
        let unpacker = match (upload.unpack, &self.unpacker) {
            (false, _) => None,
            (true, Some(unpacker)) => Some(unpacker.clone()),
            (true, None) => return Err(StoreError::UnpackUnavailable),
        };

        tracing::info!(
            %repository,
            artifact = %upload.name,
            bytes = upload.content.len(),
            ttl_s = upload.ttl_s,
            overwrite = upload.overwrite,
            unpack = upload.unpack,
            "uploading artifact"
        );

        let access = self.coordinator.acquire().await;
        self.require_repository(repository).await?;
        if !upload.overwrite && self.artifact_exists(repository, &upload.name).await {
            return Err(StoreError::Conflict {
                repository: repository.clone(),
                artifact: upload.name,
            });
        }

        let clock = self.clock.clone();
        let Upload { name, content, .. } = upload;
        let committed = access
            .transact(repository, move |tx| {
                if tx.remove_artifact(&name)? {
                    tracing::debug!(artifact = %name, "removed previous artifact");
                }

                let started = Instant::now();
                let destination = tx.artifact_path(&name);
                match unpacker {
                    Some(unpacker) => unpack_bytes(unpacker.as_ref(), &content, &destination)
                        .with_context(|| format!("failed to unpack `{name}`"))?,
                    None => tx
                        .write_artifact(&name, &content)
                        .with_context(|| format!("failed to write `{name}`"))?,
                }
                let upload_time = started.elapsed();

                let expires_at = expiry(clock.now(), ttl)?;
                tx.index_mut().insert(name.clone(), TtlRecord::new(expires_at));
                tracing::info!(
                    artifact = %name,
                    upload_ms = upload_time.as_millis() as u64,
                    %expires_at,
                    "artifact written"
                );
                Ok(UploadOutcome {
                    name,
                    expires_at,
                    upload_time,
                    publish_time: Duration::ZERO,
                })
            })
            .await?;

        self.notify(repository).await?;
        Ok(UploadOutcome {
            publish_time: committed.publish_time,
            ..committed.value
        })
    }

    /// Move the expiry of an existing artifact to `now + ttl_s`. The content
    /// is left untouched.
    pub async fn update_ttl(
        &self,
        repository: &RepositoryName,
        name: &str,
        ttl_s: i64,
    ) -> Result<TtlUpdate, StoreError> {
        check_artifact_name(name)?;
        let ttl = self.checked_ttl(ttl_s)?;
        tracing::info!(%repository, artifact = %name, ttl_s, "updating ttl");

        let access = self.coordinator.acquire().await;
        self.require_repository(repository).await?;
        if !self.artifact_exists(repository, name).await {
            return Err(StoreError::ArtifactNotFound {
                repository: repository.clone(),
                artifact: name.to_string(),
            });
        }

        let clock = self.clock.clone();
        let name = name.to_string();
        let committed = access
            .transact(repository, move |tx| {
                let expires_at = expiry(clock.now(), ttl)?;
                tx.index_mut().insert(name.clone(), TtlRecord::new(expires_at));
                Ok(TtlUpdate {
                    name,
                    ttl_s,
                    expires_at,
                })
            })
            .await?;

        self.notify(repository).await?;
        Ok(committed.value)
    }

    /// Remove an artifact and its index entry in one revision. Artifacts
    /// that were never tracked (no index entry) can be deleted too.
    pub async fn delete_artifact(
        &self,
        repository: &RepositoryName,
        name: &str,
    ) -> Result<(), StoreError> {
        check_artifact_name(name)?;
        tracing::info!(%repository, artifact = %name, "deleting artifact");

        let access = self.coordinator.acquire().await;
        self.require_repository(repository).await?;
        if !self.artifact_exists(repository, name).await {
            return Err(StoreError::ArtifactNotFound {
                repository: repository.clone(),
                artifact: name.to_string(),
            });
        }

        let name = name.to_string();
        access
            .transact(repository, move |tx| {
                if !tx.remove_artifact(&name)? {
                    anyhow::bail!("`{name}` disappeared before it could be removed");
                }
                if tx.index().contains(&name) {
                    tx.index_mut().remove(&name);
                } else {
                    tracing::debug!(artifact = %name, "deleted artifact had no ttl entry");
                }
                Ok(())
            })
            .await?;

        self.notify(repository).await?;
        Ok(())
    }

    /// Names of the regular files directly under the repository, sorted,
    /// excluding the index. Lock-free; reflects whatever revision is
    /// currently mounted.
    pub async fn list_artifacts(
        &self,
        repository: &RepositoryName,
    ) -> Result<Vec<String>, StoreError> {
        let path = self.root.repository_path(repository);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(StoreError::RepositoryNotFound(repository.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::RepositoryNotFound(repository.clone()))
            }
            Err(e) => return Err(e.into()),
        }

        let mut entries = tokio::fs::read_dir(&path).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_reserved(&name) {
                continue;
            }
            // follows links, like a reader of the mounted repository would
            match tokio::fs::metadata(entry.path()).await {
                Ok(metadata) if metadata.is_file() => files.push(name),
                Ok(_) => {}
                Err(e) => tracing::debug!(entry = %name, error = %e, "skipping unreadable entry"),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Resolve a file artifact for reading.
    pub async fn open_artifact(
        &self,
        repository: &RepositoryName,
        name: &str,
    ) -> Result<PathBuf, StoreError> {
        check_artifact_name(name)?;
        self.require_repository(repository).await?;

        let path = self.artifact_path(repository, name);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::ArtifactNotFound {
                    repository: repository.clone(),
                    artifact: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        if metadata.is_dir() {
            return Err(StoreError::IsDirectory {
                repository: repository.clone(),
                artifact: name.to_string(),
            });
        }
        Ok(path)
    }
}
