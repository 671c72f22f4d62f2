use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use ephemeral_daemon::http_server::api::client::ApiError;
use ephemeral_daemon::http_server::api::repos::{UpdateTtlRequest, UpdateTtlResponse};

use super::format_expiry;

/// Reset an artifact's expiry to now plus a new TTL.
#[derive(Args, Debug, Clone)]
pub struct Ttl {
    pub repository: String,

    pub name: String,

    /// Seconds from now until the artifact expires
    #[arg(long)]
    pub ttl_s: i64,
}

#[derive(Debug)]
pub struct TtlOutput {
    pub response: UpdateTtlResponse,
}

impl fmt::Display for TtlOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} TTL of {} to {}s",
            "Updated".green().bold(),
            self.response.filename.bold(),
            self.response.ttl_s
        )?;
        write!(
            f,
            "  {} {}",
            "expires:".dimmed(),
            format_expiry(self.response.expires_at)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TtlError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ttl {
    type Error = TtlError;
    type Output = TtlOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx
            .client
            .call(UpdateTtlRequest {
                repository: self.repository.clone(),
                filename: self.name.clone(),
                ttl_s: self.ttl_s,
            })
            .await?;
        Ok(TtlOutput { response })
    }
}
