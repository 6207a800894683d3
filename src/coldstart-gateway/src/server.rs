//! Router assembly: the activation handler plus the gateway's own
//! `/metrics` and `/api/livez` surface.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Router, TypedHeader};
use headers::ContentType;
use tower_http::trace::TraceLayer;

use crate::handler::{handle, GatewayState};

/// Builds the full router. The server this is handed to (via
/// `axum::Server`, itself backed by `hyper`) advertises both HTTP/1.1 and
/// h2c on the same listener by default; no special configuration is
/// needed beyond not restricting the connection to HTTP/1 only.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/api/livez", get(handle_liveness_check))
        .route("/metrics", get(handle_metrics))
        .fallback(handle)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn handle_liveness_check() -> impl IntoResponse {
    (StatusCode::OK, "Liveness check successful!")
}

#[allow(clippy::unused_async)]
async fn handle_metrics(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    match state.metrics.encode_text() {
        Ok(buffer) => Ok((TypedHeader(ContentType::text()), buffer)),
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}
