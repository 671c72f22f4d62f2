use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::prelude::{unix_seconds, StoreError};

use super::parse_repository;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::api::error::store_error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlQuery {
    pub ttl_s: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTtlRequest {
    pub repository: String,
    pub filename: String,
    pub ttl_s: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTtlResponse {
    pub filename: String,
    pub ttl_s: i64,
    pub expires_at: f64,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path((repository, filename)): Path<(String, String)>,
    Query(query): Query<TtlQuery>,
) -> Result<impl IntoResponse, UpdateTtlError> {
    let repository = parse_repository(&repository)?;
    let update = state
        .store()
        .update_ttl(&repository, &filename, query.ttl_s)
        .await?;

    Ok((
        http::StatusCode::OK,
        Json(UpdateTtlResponse {
            filename: update.name,
            ttl_s: update.ttl_s,
            expires_at: unix_seconds(update.expires_at),
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateTtlError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for UpdateTtlError {
    fn into_response(self) -> Response {
        match self {
            UpdateTtlError::Store(e) => store_error_response(&e),
        }
    }
}

impl ApiRequest for UpdateTtlRequest {
    type Response = UpdateTtlResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = endpoint(base_url, &["repos", &self.repository, &self.filename, "ttl"]);
        client.post(full_url).query(&[("ttl_s", self.ttl_s)])
    }
}
