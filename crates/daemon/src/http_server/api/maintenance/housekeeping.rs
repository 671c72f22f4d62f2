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
pub struct HousekeepingRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingResponse {
    pub message: String,
    pub housekeeping_time_s: f64,
    pub cleaned: usize,
    /// Repositories whose sweep failed
    pub failed: Vec<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
) -> Result<impl IntoResponse, HousekeepingApiError> {
    let report = state.housekeeper().run_all().await?;
    Ok((
        http::StatusCode::OK,
        Json(HousekeepingResponse {
            message: "Housekeeping completed".to_string(),
            housekeeping_time_s: report.elapsed.as_secs_f64(),
            cleaned: report.cleaned(),
            failed: report
                .failed
                .iter()
                .map(|(repository, _)| repository.to_string())
                .collect(),
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum HousekeepingApiError {
    #[error(transparent)]
    Housekeeping(#[from] HousekeepingError),
}

impl IntoResponse for HousekeepingApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "housekeeping failed");
        error_response(http::StatusCode::INTERNAL_SERVER_ERROR, "housekeeping failed")
    }
}

impl ApiRequest for HousekeepingRequest {
    type Response = HousekeepingResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.post(endpoint(base_url, &["housekeeping"]))
    }
}
