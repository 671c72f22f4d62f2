use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use ephemeral_daemon::http_server::health::liveness::LivezRequest;
use ephemeral_daemon::{BackendConfig, ServiceConfig};

/// Check the local config and whether the daemon answers.
#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug)]
pub struct ConfigInfo {
    pub path: Option<PathBuf>,
    pub storage_root: PathBuf,
    pub storage_root_ok: bool,
    pub backend: String,
    pub listen_addr: String,
}

#[derive(Debug)]
pub enum EndpointStatus {
    Ok,
    Unhealthy(String),
    NotReachable,
}

#[derive(Debug)]
pub struct HealthOutput {
    pub config: Result<ConfigInfo, String>,
    pub url: String,
    pub livez: EndpointStatus,
}

impl fmt::Display for HealthOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", "Config".bold())?;
        match &self.config {
            Ok(info) => {
                let path = info
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(defaults)".to_string());
                writeln!(f, "  {} {}", "file:".dimmed(), path)?;
                let root_status = if info.storage_root_ok {
                    "OK".green().to_string()
                } else {
                    "MISSING".red().to_string()
                };
                writeln!(
                    f,
                    "  {} {} {}",
                    "storage_root:".dimmed(),
                    info.storage_root.display(),
                    root_status
                )?;
                writeln!(f, "  {} {}", "backend:".dimmed(), info.backend)?;
                writeln!(f, "  {} {}", "listen_addr:".dimmed(), info.listen_addr)?;
            }
            Err(e) => writeln!(f, "  {} {}", "error:".red(), e)?,
        }

        writeln!(f)?;
        writeln!(f, "{} ({}):", "Daemon".bold(), self.url)?;
        let status = match &self.livez {
            EndpointStatus::Ok => "OK".green().to_string(),
            EndpointStatus::Unhealthy(code) => format!("{} ({})", "UNHEALTHY".red(), code),
            EndpointStatus::NotReachable => "NOT REACHABLE".red().to_string(),
        };
        write!(f, "  {} {}", "livez:".dimmed(), status)
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = std::convert::Infallible;
    type Output = HealthOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = ServiceConfig::load(ctx.config_path.as_deref())
            .map(|config| ConfigInfo {
                path: ctx.config_path.clone(),
                storage_root_ok: config.storage_root.is_dir(),
                storage_root: config.storage_root,
                backend: match config.backend {
                    BackendConfig::Cvmfs(_) => "cvmfs".to_string(),
                    BackendConfig::Local => "local".to_string(),
                },
                listen_addr: config.listen_addr.to_string(),
            })
            .map_err(|e| e.to_string());

        let livez = match ctx.client.call(LivezRequest {}).await {
            Ok(livez) if livez.is_ok() => EndpointStatus::Ok,
            Ok(livez) => EndpointStatus::Unhealthy(livez.status),
            Err(e) => match e.status() {
                Some(status) => EndpointStatus::Unhealthy(status.to_string()),
                None => EndpointStatus::NotReachable,
            },
        };

        Ok(HealthOutput {
            config,
            url: ctx.client.base_url().to_string(),
            livez,
        })
    }
}
