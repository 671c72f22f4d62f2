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
pub struct ListRequest {
    pub repository: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub files: Vec<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(repository): Path<String>,
) -> Result<impl IntoResponse, ListError> {
    let repository = parse_repository(&repository)?;
    let files = state.store().list_artifacts(&repository).await?;
    Ok((http::StatusCode::OK, Json(ListResponse { files })).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ListError {
    fn into_response(self) -> Response {
        match self {
            ListError::Store(e) => store_error_response(&e),
        }
    }
}

impl ApiRequest for ListRequest {
    type Response = ListResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.get(endpoint(base_url, &["repos", &self.repository]))
    }
}
