use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use ephemeral_daemon::http_server::api::client::ApiError;

/// Download an artifact.
#[derive(Args, Debug, Clone)]
pub struct Get {
    pub repository: String,

    pub name: String,

    /// Where to write the artifact (defaults to its name in the current
    /// directory)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub struct GetOutput {
    pub path: PathBuf,
    pub size: usize,
}

impl fmt::Display for GetOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} bytes)",
            "Saved".green().bold(),
            self.path.display(),
            self.size
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Get {
    type Error = GetError;
    type Output = GetOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let content = ctx.client.download(&self.repository, &self.name).await?;
        let path = self
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.name));
        tokio::fs::write(&path, &content)
            .await
            .map_err(|source| GetError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(GetOutput {
            path,
            size: content.len(),
        })
    }
}
