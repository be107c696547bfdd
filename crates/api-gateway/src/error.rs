//! Mapping of failures to HTTP responses
//!
//! Client errors carry a short message; internal errors only expose the
//! error kind, never the underlying error text.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use common::error::ErrorKind;
use common::types::ErrorBody;

/// Message returned with every internal error
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Error returned by a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request was malformed or incomplete (400)
    BadRequest(String),

    /// Processing failed on our side (500)
    Internal(ErrorKind),

    /// The request body could not be read, e.g. it exceeds the size limit
    Rejected {
        /// Status chosen by the body extractor
        status: StatusCode,
        /// Extractor message
        message: String,
    },

    /// No such route (404)
    NotFound,
}

impl ApiError {
    /// Status code of the response
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Rejected { status, .. } => *status,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Body of the response
    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::BadRequest(message) => ErrorBody {
                error: message.clone(),
                details: None,
            },
            ApiError::Internal(kind) => ErrorBody {
                error: INTERNAL_ERROR_MESSAGE.to_string(),
                details: Some(kind.as_str().to_string()),
            },
            ApiError::Rejected { message, .. } => ErrorBody {
                error: message.clone(),
                details: None,
            },
            ApiError::NotFound => ErrorBody {
                error: "Not found".to_string(),
                details: None,
            },
        }
    }
}

impl From<common::Error> for ApiError {
    fn from(err: common::Error) -> Self {
        match err {
            common::Error::Validation(message) => ApiError::BadRequest(message),
            other => ApiError::Internal(other.kind()),
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_hide_the_cause() {
        let err = ApiError::from(common::Error::inference("classify", "index 7 out of bounds at model.rs:12"));

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.body();
        assert_eq!(body.error, INTERNAL_ERROR_MESSAGE);
        assert_eq!(body.details.as_deref(), Some("inference_error"));
        assert!(!serde_json::to_string(&body).unwrap().contains("model.rs"));
    }

    #[test]
    fn test_validation_is_bad_request() {
        let err = ApiError::from(common::Error::Validation("Missing 'review' field".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body().error, "Missing 'review' field");
    }
}
