use axum::extract::{Path, Request, State};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use common::prelude::StoreError;

use super::parse_repository;
use crate::http_server::api::error::store_error_response;
use crate::ServiceState;

/// Streams a file artifact. Conditional and range requests are handled by
/// `ServeFile`.
pub async fn handler(
    State(state): State<ServiceState>,
    Path((repository, filename)): Path<(String, String)>,
    request: Request,
) -> Result<Response, DownloadError> {
    let repository = parse_repository(&repository)?;
    let path = state.store().open_artifact(&repository, &filename).await?;
    tracing::debug!(%repository, artifact = %filename, "serving artifact");

    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };
    Ok(response)
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for DownloadError {
    fn into_response(self) -> Response {
        match self {
            DownloadError::Store(e) => store_error_response(&e),
        }
    }
}
