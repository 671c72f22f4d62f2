use clap::Args;

use ephemeral_daemon::http_server::api::client::ApiError;
use ephemeral_daemon::http_server::api::maintenance::GcRequest;

/// Garbage-collect old revisions in every repository.
#[derive(Args, Debug, Clone)]
pub struct Gc;

#[derive(Debug, thiserror::Error)]
pub enum GcError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Gc {
    type Error = GcError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(GcRequest {}).await?;
        Ok(format!("{} in {:.2}s", response.message, response.gc_time_s))
    }
}
