pub mod api;
pub mod middleware;

pub use api::ApiState;

use axum::{Router, http::StatusCode, response::IntoResponse};

/// Build the complete HTTP surface: the versioned API plus liveness probe.
pub fn build_router(state: ApiState) -> Router {
    let health_state = state.clone();
    Router::new()
        .route(
            "/healthz",
            axum::routing::get(move || health_check(health_state.clone())),
        )
        .merge(api::build_api_router(state))
}

async fn health_check(state: ApiState) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "database unreachable"),
    }
}
