use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

pub mod client;
mod error;
pub mod maintenance;
pub mod repos;

pub use error::ErrorBody;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    let max_upload = state.config().max_upload_bytes();

    Router::new()
        .route(
            "/repos/:repo",
            post(repos::upload::handler).get(repos::list::handler),
        )
        .route("/repos/:repo/clean", post(repos::clean::handler))
        .route("/repos/:repo/notify", post(repos::notify::handler))
        .route(
            "/repos/:repo/:name",
            get(repos::download::handler).delete(repos::delete::handler),
        )
        .route("/repos/:repo/:name/ttl", post(repos::update_ttl::handler))
        .route("/gc", post(maintenance::gc::handler))
        .route("/housekeeping", post(maintenance::housekeeping::handler))
        .route("/resign", post(maintenance::resign::handler))
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state)
}
