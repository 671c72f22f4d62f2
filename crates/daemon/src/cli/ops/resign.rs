use clap::Args;

use ephemeral_daemon::http_server::api::client::ApiError;
use ephemeral_daemon::http_server::api::maintenance::ResignRequest;

/// Renew repository signatures now instead of waiting for midnight.
#[derive(Args, Debug, Clone)]
pub struct Resign;

#[derive(Debug, thiserror::Error)]
pub enum ResignError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Resign {
    type Error = ResignError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(ResignRequest {}).await?;
        Ok(response.message)
    }
}
