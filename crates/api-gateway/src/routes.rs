//! Route table

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Builds the service router
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let routes = Router::new()
        .route("/predict", post(handlers::predict))
        .route("/version", get(handlers::version))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .with_state(state);

    middleware::apply(routes, request_timeout)
}
