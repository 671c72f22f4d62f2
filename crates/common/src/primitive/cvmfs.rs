use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::{MaintenancePrimitive, NotifyPrimitive, PrimitiveError, TransactionPrimitive};
use crate::repository::RepositoryName;

/// Where the CVMFS tooling lives and how it reaches the notification
/// service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvmfsServerConfig {
    /// `cvmfs_server` executable
    pub server_bin: String,
    /// `cvmfs_swissknife` executable
    pub swissknife_bin: String,
    /// cvmfs-gateway notification API
    pub notification_url: String,
    /// Base URL the repositories are served from; the repository name is
    /// appended.
    pub repository_base_url: String,
    /// Revisions preserved by `cvmfs_server gc -r`.
    pub gc_keep_revisions: u32,
}

impl Default for CvmfsServerConfig {
    fn default() -> Self {
        Self {
            server_bin: "cvmfs_server".to_string(),
            swissknife_bin: "cvmfs_swissknife".to_string(),
            notification_url: "http://localhost:4929/api/v1".to_string(),
            repository_base_url: "http://localhost/cvmfs".to_string(),
            gc_keep_revisions: 0,
        }
    }
}

/// Drives a CVMFS stratum 0 by shelling out to `cvmfs_server` and
/// `cvmfs_swissknife`.
#[derive(Debug, Clone)]
pub struct CvmfsServer {
    config: CvmfsServerConfig,
}

impl CvmfsServer {
    pub fn new(config: CvmfsServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CvmfsServerConfig {
        &self.config
    }

    pub(crate) fn transaction_args(repository: &RepositoryName) -> Vec<String> {
        vec!["transaction".to_string(), repository.to_string()]
    }

    pub(crate) fn publish_args(repository: &RepositoryName) -> Vec<String> {
        vec!["publish".to_string(), repository.to_string()]
    }

    pub(crate) fn abort_args(repository: &RepositoryName, force: bool) -> Vec<String> {
        let mut args = vec!["abort".to_string(), repository.to_string()];
        if force {
            args.push("-f".to_string());
        }
        args
    }

    pub(crate) fn gc_args(&self) -> Vec<String> {
        vec![
            "gc".to_string(),
            "-r".to_string(),
            self.config.gc_keep_revisions.to_string(),
            "-f".to_string(),
        ]
    }

    pub(crate) fn notify_args(&self, repository: &RepositoryName) -> Vec<String> {
        vec![
            "notify".to_string(),
            "-p".to_string(),
            "-u".to_string(),
            self.config.notification_url.clone(),
            "-r".to_string(),
            format!(
                "{}/{}",
                self.config.repository_base_url.trim_end_matches('/'),
                repository
            ),
        ]
    }

    async fn run(&self, program: &str, args: Vec<String>) -> Result<(), PrimitiveError> {
        let command = format!("{} {}", program, args.join(" "));
        tracing::debug!(%command, "running");

        let started = Instant::now();
        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| PrimitiveError::Spawn {
                command: command.clone(),
                source,
            })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if output.status.success() {
            tracing::debug!(%command, elapsed_ms, "command succeeded");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(%command, status = %output.status, elapsed_ms, %stderr, "command failed");
        Err(PrimitiveError::Exit {
            command,
            status: output.status,
            stderr,
        })
    }
}

#[async_trait]
impl TransactionPrimitive for CvmfsServer {
    async fn begin(&self, repository: &RepositoryName) -> Result<(), PrimitiveError> {
        self.run(&self.config.server_bin, Self::transaction_args(repository))
            .await
    }

    async fn publish(&self, repository: &RepositoryName) -> Result<(), PrimitiveError> {
        self.run(&self.config.server_bin, Self::publish_args(repository))
            .await
    }

    async fn abort(&self, repository: &RepositoryName, force: bool) -> Result<(), PrimitiveError> {
        self.run(&self.config.server_bin, Self::abort_args(repository, force))
            .await
    }
}

#[async_trait]
impl MaintenancePrimitive for CvmfsServer {
    async fn gc(&self) -> Result<(), PrimitiveError> {
        self.run(&self.config.server_bin, self.gc_args()).await
    }

    async fn resign(&self) -> Result<(), PrimitiveError> {
        self.run(&self.config.server_bin, vec!["resign".to_string()])
            .await
    }
}

#[async_trait]
impl NotifyPrimitive for CvmfsServer {
    async fn notify(&self, repository: &RepositoryName) -> Result<(), PrimitiveError> {
        self.run(&self.config.swissknife_bin, self.notify_args(repository))
            .await
    }
}
