use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::prelude::HousekeepingError;

use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::api::error::error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResignRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResignResponse {
    pub message: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
) -> Result<impl IntoResponse, ResignError> {
    state.housekeeper().resign().await?;
    Ok((
        http::StatusCode::OK,
        Json(ResignResponse {
            message: "cvmfs_server resign completed successfully".to_string(),
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum ResignError {
    #[error(transparent)]
    Housekeeping(#[from] HousekeepingError),
}

impl IntoResponse for ResignError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "re-signing failed");
        error_response(http::StatusCode::INTERNAL_SERVER_ERROR, "re-signing failed")
    }
}

impl ApiRequest for ResignRequest {
    type Response = ResignResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.post(endpoint(base_url, &["resign"]))
    }
}
