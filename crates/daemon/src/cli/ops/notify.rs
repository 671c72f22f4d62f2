use clap::Args;

use ephemeral_daemon::http_server::api::client::ApiError;
use ephemeral_daemon::http_server::api::repos::NotifyRequest;

/// Tell subscribed clients that a repository has a new revision.
#[derive(Args, Debug, Clone)]
pub struct Notify {
    pub repository: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Notify {
    type Error = NotifyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx
            .client
            .call(NotifyRequest {
                repository: self.repository.clone(),
            })
            .await?;
        Ok(response.message)
    }
}
