//! Endpoint handlers

use std::time::Instant;

use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use tracing::{debug, error, info, warn};

use common::error::{Error, ErrorKind};
use common::types::{HealthStatus, PredictionResult, VersionInfo};
use common::utils::truncate_string;
use performance_monitor::CONTENT_TYPE;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;

/// `POST /predict`
///
/// The body is taken raw so that malformed JSON yields our own 400 body
/// instead of the extractor's rejection. Bodies the extractor refuses
/// (over the size limit) are reported and counted the same way.
pub async fn predict(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Rejected prediction request body: {}", rejection.body_text());
            state.metrics.record_error(ErrorKind::Validation);
            return ApiError::from(rejection).into_response();
        }
    };

    let review = match validation::extract_review(&body) {
        Ok(review) => review,
        Err(e) => {
            warn!("Rejected prediction request: {}", e);
            state.metrics.record_error(e.kind());
            return ApiError::from(e).into_response();
        }
    };

    debug!(review = %truncate_string(&review, 80), "Received review");

    let start = Instant::now();
    match state.engine.predict(&review) {
        Ok(prediction) => {
            state.metrics.record_prediction(prediction, &state.service_version);
            state.metrics.record_latency(start.elapsed());
            info!(%prediction, version = %state.service_version, "Prediction served");

            Json(PredictionResult {
                prediction,
                version: state.service_version.to_string(),
            })
            .into_response()
        }
        Err(e) => {
            error!(kind = %e.kind(), "Prediction failed: {}", error_chain(&e));
            state.metrics.record_error(e.kind());
            ApiError::from(e).into_response()
        }
    }
}

/// `GET /version`
pub async fn version(State(state): State<AppState>) -> Json<VersionInfo> {
    Json(VersionInfo {
        version: state.versions.resolve_version().await,
    })
}

/// `GET /health`
///
/// The state only exists once the engine is loaded, so answering at all
/// means the service is ready.
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], state.metrics.snapshot())
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

fn error_chain(err: &Error) -> String {
    let mut chain = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
