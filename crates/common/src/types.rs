//! Common types for the sentiment model service
//!
//! This module defines the request, response and domain types exchanged
//! between the HTTP façade and the inference engine.

use std::fmt;
use serde::{Deserialize, Serialize};

/// Version reported when nothing better is known
pub const UNKNOWN_VERSION: &str = "unknown";

/// Binary sentiment produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Positive review
    Positive,
    /// Negative review
    Negative,
}

impl Sentiment {
    /// Maps a raw classifier label to a sentiment.
    ///
    /// Label `1` is positive; every other label is negative.
    pub fn from_label(label: i64) -> Self {
        if label == 1 {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        }
    }

    /// Returns the lowercase name used on the wire and in metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a `/predict` request.
///
/// `review` is optional at the type level so that a missing field can be
/// reported as a validation failure instead of a decoding failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Review text to classify
    #[serde(default)]
    pub review: Option<String>,
}

/// Successful prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted sentiment
    pub prediction: Sentiment,
    /// Version of the service that produced the prediction
    pub version: String,
}

/// Version metadata returned by `/version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Resolved model service version
    pub version: String,
}

/// Body returned by `/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Liveness status
    pub status: String,
}

impl HealthStatus {
    /// Liveness acknowledgment
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }
}

/// Error body returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Short human-readable message
    pub error: String,
    /// Machine-readable error kind, present on internal failures
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping() {
        assert_eq!(Sentiment::from_label(1), Sentiment::Positive);
        assert_eq!(Sentiment::from_label(0), Sentiment::Negative);
        assert_eq!(Sentiment::from_label(-1), Sentiment::Negative);
        assert_eq!(Sentiment::from_label(2), Sentiment::Negative);
    }

    #[test]
    fn test_prediction_result_wire_format() {
        let result = PredictionResult {
            prediction: Sentiment::Positive,
            version: "1.2.0".to_string(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"prediction": "positive", "version": "1.2.0"}));
    }

    #[test]
    fn test_request_without_review() {
        let request: PredictionRequest = serde_json::from_str("{}").unwrap();
        assert!(request.review.is_none());

        let request: PredictionRequest = serde_json::from_str(r#"{"review": "ok"}"#).unwrap();
        assert_eq!(request.review.as_deref(), Some("ok"));
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let body = ErrorBody { error: "bad".into(), details: None };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"error":"bad"}"#);
    }
}
