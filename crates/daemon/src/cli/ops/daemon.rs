use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use ephemeral_daemon::process::{ServiceError, TracingError};
use ephemeral_daemon::{init_tracing, spawn_service, ConfigError, ServiceConfig};

/// Run the HTTP service and the housekeeping scheduler in the foreground.
#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override the configured listen address
    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Override the configured storage root
    #[arg(long)]
    pub storage_root: Option<PathBuf>,
}

#[derive(Debug)]
pub struct DaemonOutput {
    pub listen_addr: SocketAddr,
}

impl fmt::Display for DaemonOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} daemon on {}",
            "Stopped".yellow().bold(),
            self.listen_addr
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to set up logging: {0}")]
    Tracing(#[from] TracingError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = DaemonOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = ServiceConfig::load(ctx.config_path.as_deref())?;
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(root) = &self.storage_root {
            config.storage_root = root.clone();
        }

        let _guard = init_tracing(&config)?;
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            storage_root = %config.storage_root.display(),
            listen_addr = %config.listen_addr,
            "starting daemon"
        );

        spawn_service(&config).await?;

        Ok(DaemonOutput {
            listen_addr: config.listen_addr,
        })
    }
}
