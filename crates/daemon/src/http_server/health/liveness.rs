use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use crate::http_server::api::client::{endpoint, ApiRequest};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivezRequest {}

/// `{"status": "ok"}`. There is no failing variant: a daemon that can
/// answer is alive, and anything else shows up as a transport error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivezResponse {
    pub status: String,
}

impl LivezResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

impl ApiRequest for LivezRequest {
    type Response = LivezResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.get(endpoint(base_url, &["_status", "livez"]))
    }
}

/// Stateless: never reads the storage root or waits on the transaction
/// lock, so it keeps answering through a slow publish.
pub async fn handler() -> Json<LivezResponse> {
    Json(LivezResponse {
        status: "ok".to_string(),
    })
}
