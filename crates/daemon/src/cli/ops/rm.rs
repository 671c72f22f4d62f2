use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use ephemeral_daemon::http_server::api::client::ApiError;
use ephemeral_daemon::http_server::api::repos::DeleteRequest;

/// Delete an artifact before it expires.
#[derive(Args, Debug, Clone)]
pub struct Rm {
    pub repository: String,

    pub name: String,
}

#[derive(Debug)]
pub struct RmOutput {
    pub name: String,
}

impl fmt::Display for RmOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", "Deleted".green().bold(), self.name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rm {
    type Error = RmError;
    type Output = RmOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx
            .client
            .call(DeleteRequest {
                repository: self.repository.clone(),
                target_name: self.name.clone(),
            })
            .await?;
        Ok(RmOutput {
            name: response.target_name,
        })
    }
}
