use clap::Args;

use ephemeral_daemon::http_server::api::client::ApiError;
use ephemeral_daemon::http_server::api::repos::CleanRequest;

/// Remove expired artifacts from one repository now.
#[derive(Args, Debug, Clone)]
pub struct Clean {
    pub repository: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Clean {
    type Error = CleanError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx
            .client
            .call(CleanRequest {
                repository: self.repository.clone(),
            })
            .await?;
        Ok(response.message)
    }
}
