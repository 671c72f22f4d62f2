//! Per-repository artifact endpoints under `/repos/:repo`.

use common::prelude::{RepositoryName, StoreError};

pub mod clean;
pub mod delete;
pub mod download;
pub mod list;
pub mod notify;
pub mod update_ttl;
pub mod upload;

// Re-export request/response types for use by CLI and other clients
pub use clean::{CleanRequest, CleanResponse};
pub use delete::{DeleteRequest, DeleteResponse};
pub use list::{ListRequest, ListResponse};
pub use notify::{NotifyRequest, NotifyResponse};
pub use update_ttl::{UpdateTtlRequest, UpdateTtlResponse};
pub use upload::{UploadQuery, UploadRequest, UploadResponse};

fn parse_repository(name: &str) -> Result<RepositoryName, StoreError> {
    Ok(RepositoryName::parse(name)?)
}
