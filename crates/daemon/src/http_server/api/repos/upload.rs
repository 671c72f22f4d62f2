use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::multipart;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::prelude::{unix_seconds, StoreError, Upload};

use super::parse_repository;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::api::error::{error_response, store_error_response};
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub overwrite: bool,
    /// Falls back to the configured default TTL
    pub ttl_s: Option<i64>,
    #[serde(default)]
    pub unpack: bool,
}

/// Multipart upload of a single file; the part's filename becomes the
/// artifact name.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub repository: String,
    pub filename: String,
    pub content: Vec<u8>,
    pub query: UploadQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub content_type: Option<String>,
    /// Unix seconds
    pub expires_at: f64,
    pub upload_time_s: f64,
    pub publish_time_s: f64,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(repository): Path<String>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, UploadError> {
    let repository = parse_repository(&repository)?;

    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_owned)
            .ok_or(UploadError::MissingFilename)?;
        let content_type = field.content_type().map(str::to_owned);
        let content = field.bytes().await?;
        file = Some((filename, content_type, content));
        break;
    }
    let (filename, content_type, content) = file.ok_or(UploadError::MissingFile)?;

    let ttl_s = query.ttl_s.unwrap_or(state.config().default_ttl_s);
    tracing::info!(
        %repository,
        artifact = %filename,
        content_type = content_type.as_deref().unwrap_or("unknown"),
        ttl_s,
        "upload requested"
    );

    let upload = Upload::new(filename, content, ttl_s)
        .overwrite(query.overwrite)
        .unpack(query.unpack);
    let outcome = state.store().upload(&repository, upload).await?;

    Ok((
        http::StatusCode::OK,
        Json(UploadResponse {
            filename: outcome.name,
            content_type,
            expires_at: unix_seconds(outcome.expires_at),
            upload_time_s: outcome.upload_time.as_secs_f64(),
            publish_time_s: outcome.publish_time.as_secs_f64(),
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("missing `file` part")]
    MissingFile,
    #[error("`file` part has no filename")]
    MissingFilename,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::Multipart(e) => error_response(e.status(), e.body_text()),
            UploadError::MissingFile | UploadError::MissingFilename => {
                error_response(http::StatusCode::BAD_REQUEST, self.to_string())
            }
            UploadError::Store(e) => store_error_response(&e),
        }
    }
}

impl ApiRequest for UploadRequest {
    type Response = UploadResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = endpoint(base_url, &["repos", &self.repository]);
        let part = multipart::Part::bytes(self.content).file_name(self.filename);
        let form = multipart::Form::new().part("file", part);
        client.post(full_url).query(&self.query).multipart(form)
    }
}
