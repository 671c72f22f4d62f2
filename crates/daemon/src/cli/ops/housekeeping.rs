use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use ephemeral_daemon::http_server::api::client::ApiError;
use ephemeral_daemon::http_server::api::maintenance::{HousekeepingRequest, HousekeepingResponse};

/// Sweep expired artifacts from every repository, then garbage-collect.
#[derive(Args, Debug, Clone)]
pub struct Housekeeping;

#[derive(Debug)]
pub struct HousekeepingOutput {
    pub response: HousekeepingResponse,
}

impl fmt::Display for HousekeepingOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {:.2}s, {} expired artifact(s) removed",
            self.response.message.green(),
            self.response.housekeeping_time_s,
            self.response.cleaned
        )?;
        for repository in &self.response.failed {
            write!(f, "\n  {} {}", "failed:".red(), repository)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HousekeepingError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Housekeeping {
    type Error = HousekeepingError;
    type Output = HousekeepingOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(HousekeepingRequest {}).await?;
        Ok(HousekeepingOutput { response })
    }
}
