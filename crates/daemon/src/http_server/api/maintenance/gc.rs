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
pub struct GcRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcResponse {
    pub message: String,
    pub gc_time_s: f64,
}

pub async fn handler(State(state): State<ServiceState>) -> Result<impl IntoResponse, GcError> {
    let elapsed = state.housekeeper().gc().await?;
    Ok((
        http::StatusCode::OK,
        Json(GcResponse {
            message: "Garbage collection completed".to_string(),
            gc_time_s: elapsed.as_secs_f64(),
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum GcError {
    #[error(transparent)]
    Housekeeping(#[from] HousekeepingError),
}

impl IntoResponse for GcError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "garbage collection failed");
        error_response(
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "garbage collection failed",
        )
    }
}

impl ApiRequest for GcRequest {
    type Response = GcResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.post(endpoint(base_url, &["gc"]))
    }
}
