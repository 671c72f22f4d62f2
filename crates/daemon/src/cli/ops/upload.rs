use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use ephemeral_daemon::http_server::api::client::ApiError;
use ephemeral_daemon::http_server::api::repos::{UploadQuery, UploadRequest, UploadResponse};

use super::format_expiry;

/// Upload a file as an artifact.
#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// Repository, e.g. `unstable.cvmfs.example.org`
    pub repository: String,

    /// Local file to upload
    pub path: PathBuf,

    /// Artifact name (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Seconds until the artifact expires (defaults to the server's setting)
    #[arg(long)]
    pub ttl_s: Option<i64>,

    /// Replace an existing artifact of the same name
    #[arg(long)]
    pub overwrite: bool,

    /// Expand the upload as an archive into a directory
    #[arg(long)]
    pub unpack: bool,
}

#[derive(Debug)]
pub struct UploadOutput {
    pub response: UploadResponse,
}

impl fmt::Display for UploadOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {}",
            "Uploaded".green().bold(),
            self.response.filename.bold()
        )?;
        writeln!(
            f,
            "  {} {}",
            "expires:".dimmed(),
            format_expiry(self.response.expires_at)
        )?;
        write!(
            f,
            "  {} upload {:.2}s, publish {:.2}s",
            "took:".dimmed(),
            self.response.upload_time_s,
            self.response.publish_time_s
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot derive an artifact name from {0}; pass --name")]
    NoName(PathBuf),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Upload {
    type Error = UploadError;
    type Output = UploadOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let filename = match &self.name {
            Some(name) => name.clone(),
            None => self
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_owned)
                .ok_or_else(|| UploadError::NoName(self.path.clone()))?,
        };
        let content = tokio::fs::read(&self.path)
            .await
            .map_err(|source| UploadError::Read {
                path: self.path.clone(),
                source,
            })?;

        let request = UploadRequest {
            repository: self.repository.clone(),
            filename,
            content,
            query: UploadQuery {
                overwrite: self.overwrite,
                ttl_s: self.ttl_s,
                unpack: self.unpack,
            },
        };
        let response = ctx.client.call(request).await?;
        Ok(UploadOutput { response })
    }
}

