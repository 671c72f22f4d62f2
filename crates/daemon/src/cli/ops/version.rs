use std::convert::Infallible;
use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use ephemeral_daemon::build_info;
use ephemeral_daemon::http_server::health::version::{BuildInfo, VersionRequest};

/// Print the CLI version and, if reachable, the daemon's.
#[derive(Args, Debug, Clone)]
pub struct Version;

#[derive(Debug)]
pub struct VersionOutput {
    pub cli: BuildInfo,
    pub daemon: Result<BuildInfo, String>,
}

impl fmt::Display for VersionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", "cli:".dimmed(), self.cli)?;
        match &self.daemon {
            Ok(info) => write!(f, "{} {}", "daemon:".dimmed(), info),
            Err(e) => write!(f, "{} {}", "daemon:".dimmed(), e.red()),
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Version {
    type Error = Infallible;
    type Output = VersionOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let daemon = ctx
            .client
            .call(VersionRequest {})
            .await
            .map_err(|e| e.to_string());
        Ok(VersionOutput {
            cli: build_info(),
            daemon,
        })
    }
}
