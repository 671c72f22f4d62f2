use bytes::Bytes;
use reqwest::{header::HeaderMap, header::HeaderValue, Client, Response};
use url::Url;

use super::error::ApiError;
use super::{endpoint, ApiRequest};
use crate::http_server::api::ErrorBody;

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<T::Response, ApiError> {
        let request_builder = request.build_request(&self.remote, &self.client);
        let response = Self::check(request_builder.send().await?).await?;
        Ok(response.json::<T::Response>().await?)
    }

    /// Fetch an artifact's raw content.
    pub async fn download(&self, repository: &str, name: &str) -> Result<Bytes, ApiError> {
        let url = endpoint(&self.remote, &["repos", repository, name]);
        let response = Self::check(self.client.get(url).send().await?).await?;
        Ok(response.bytes().await?)
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await?;
        // prefer the `detail` of a JSON error body over the raw text
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.detail)
            .unwrap_or(text);
        Err(ApiError::HttpStatus(status, detail))
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}
