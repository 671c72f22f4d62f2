use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::prelude::{StoreError, SweepOutcome};

use super::parse_repository;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::api::error::store_error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanRequest {
    pub repository: String,
}

/// `cleaned` and `errors` are absent when the repository has no ttl index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<usize>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(repository): Path<String>,
) -> Result<impl IntoResponse, CleanError> {
    let repository = parse_repository(&repository)?;
    let response = match state.store().sweep(&repository).await? {
        SweepOutcome::NoIndex => CleanResponse {
            message: "No TTL file found. Skipping clean up.".to_string(),
            cleaned: None,
            errors: None,
        },
        SweepOutcome::Swept { cleaned, errors } => CleanResponse {
            message: format!(
                "Cleaned up {cleaned} expired files in repo: {repository}. Errors: {errors}"
            ),
            cleaned: Some(cleaned),
            errors: Some(errors),
        },
    };
    Ok((http::StatusCode::OK, Json(response)).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for CleanError {
    fn into_response(self) -> Response {
        match self {
            CleanError::Store(e) => store_error_response(&e),
        }
    }
}

impl ApiRequest for CleanRequest {
    type Response = CleanResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.post(endpoint(base_url, &["repos", &self.repository, "clean"]))
    }
}
