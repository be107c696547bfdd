//! Middleware stack shared by all routes

use std::time::{Duration, Instant};

use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Request logging middleware
pub async fn logging_middleware<B>(request: Request<B>, next: Next<B>) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        warn!("{} {} {} ({:?})", method, uri, status, duration);
    } else {
        info!("{} {} {} ({:?})", method, uri, status, duration);
    }

    response
}

/// Wraps `router` with timeout, tracing, request logging and CORS.
///
/// CORS is the outermost layer so that preflight requests never reach the
/// handlers.
pub fn apply(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(logging_middleware))
        .layer(CorsLayer::permissive())
}
