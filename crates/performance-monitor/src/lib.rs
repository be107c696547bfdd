//! Prediction and error metrics for the sentiment model service
//!
//! This crate counts predictions and failures and renders them in the
//! Prometheus text exposition format for scraping.

pub mod collector;
pub mod exposition;

// Re-export commonly used types
pub use collector::{MetricEvent, MetricsRegistry, ERRORS_METRIC, LATENCY_METRIC, PREDICTIONS_METRIC};
pub use exposition::CONTENT_TYPE;

#[cfg(any(test, feature = "testing"))]
pub use exposition::{family_total, sample_value};
