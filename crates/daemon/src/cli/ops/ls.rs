use std::fmt;

use clap::Args;
use comfy_table::Table;

use ephemeral_daemon::http_server::api::client::ApiError;
use ephemeral_daemon::http_server::api::repos::ListRequest;

/// List the artifacts in a repository.
#[derive(Args, Debug, Clone)]
pub struct Ls {
    pub repository: String,
}

#[derive(Debug)]
pub struct LsOutput {
    pub files: Vec<String>,
}

impl fmt::Display for LsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.files.is_empty() {
            return write!(f, "No artifacts found");
        }

        let mut table = Table::new();
        table.set_header(vec!["NAME"]);
        for file in &self.files {
            table.add_row(vec![file.clone()]);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = LsError;
    type Output = LsOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx
            .client
            .call(ListRequest {
                repository: self.repository.clone(),
            })
            .await?;
        Ok(LsOutput {
            files: response.files,
        })
    }
}
