use axum::Router;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod health;

use crate::ServiceState;

/// The full application: health probes under `/_status`, the artifact and
/// maintenance API at the root.
pub fn router(state: ServiceState) -> Router {
    Router::new()
        .nest("/_status", health::router())
        .merge(api::router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
