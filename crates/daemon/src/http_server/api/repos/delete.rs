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
pub struct DeleteRequest {
    pub repository: String,
    pub target_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub target_name: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path((repository, target_name)): Path<(String, String)>,
) -> Result<impl IntoResponse, DeleteError> {
    let repository = parse_repository(&repository)?;
    state
        .store()
        .delete_artifact(&repository, &target_name)
        .await?;
    Ok((http::StatusCode::OK, Json(DeleteResponse { target_name })).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for DeleteError {
    fn into_response(self) -> Response {
        match self {
            DeleteError::Store(e) => store_error_response(&e),
        }
    }
}

impl ApiRequest for DeleteRequest {
    type Response = DeleteResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.delete(endpoint(
            base_url,
            &["repos", &self.repository, &self.target_name],
        ))
    }
}
