use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::prelude::StoreError;

use super::parse_repository;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::api::error::store_error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub repository: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub message: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(repository): Path<String>,
) -> Result<impl IntoResponse, NotifyError> {
    let repository = parse_repository(&repository)?;
    state.store().notify(&repository).await?;
    Ok((
        http::StatusCode::OK,
        Json(NotifyResponse {
            message: format!("Notified clients about changes in repo {repository}"),
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        match self {
            NotifyError::Store(e) => store_error_response(&e),
        }
    }
}

impl ApiRequest for NotifyRequest {
    type Response = NotifyResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.post(endpoint(base_url, &["repos", &self.repository, "notify"]))
    }
}
