//! Metrics collection
//!
//! The registry owns its own Prometheus recorder instead of installing a
//! process-wide one, so that every service instance (and every test) gets
//! independent counters. Counter handles are atomics shared by all requests.

use std::time::Duration;

use metrics::{Key, KeyName, Label, Recorder, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use tracing::trace;

use common::error::ErrorKind;
use common::types::Sentiment;

/// Successful predictions, labeled by `prediction` and `version`
pub const PREDICTIONS_METRIC: &str = "predict_requests_total";

/// Failed requests, labeled by error `kind`
pub const ERRORS_METRIC: &str = "predict_errors_total";

/// Latency of successful predictions
pub const LATENCY_METRIC: &str = "predict_latency_seconds";

/// Something worth counting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricEvent {
    /// A prediction succeeded
    PredictionRecorded {
        /// Predicted sentiment
        label: Sentiment,
        /// Service version that produced it
        version: String,
    },

    /// A request failed
    ErrorRecorded {
        /// Kind of the failure
        kind: ErrorKind,
    },
}

/// Process-wide metric state
pub struct MetricsRegistry {
    /// Recorder holding the counters
    recorder: PrometheusRecorder,

    /// Handle used to render the exposition text
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Creates a registry with all metric families described
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        recorder.describe_counter(
            KeyName::from(PREDICTIONS_METRIC),
            None,
            "Total number of successful /predict requests".into(),
        );
        recorder.describe_counter(
            KeyName::from(ERRORS_METRIC),
            None,
            "Total number of failed /predict requests".into(),
        );
        recorder.describe_histogram(
            KeyName::from(LATENCY_METRIC),
            Some(Unit::Seconds),
            "Time spent producing a prediction".into(),
        );

        Self { recorder, handle }
    }

    /// Records a metric event
    pub fn record(&self, event: MetricEvent) {
        match event {
            MetricEvent::PredictionRecorded { label, version } => self.record_prediction(label, &version),
            MetricEvent::ErrorRecorded { kind } => self.record_error(kind),
        }
    }

    /// Counts one successful prediction
    pub fn record_prediction(&self, label: Sentiment, version: &str) {
        let key = Key::from_parts(
            PREDICTIONS_METRIC,
            vec![
                Label::new("prediction", label.as_str()),
                Label::new("version", version.to_string()),
            ],
        );
        self.recorder.register_counter(&key).increment(1);
        trace!(prediction = %label, version, "Recorded prediction");
    }

    /// Counts one failed request
    pub fn record_error(&self, kind: ErrorKind) {
        let key = Key::from_parts(ERRORS_METRIC, vec![Label::new("kind", kind.as_str())]);
        self.recorder.register_counter(&key).increment(1);
        trace!(kind = %kind, "Recorded error");
    }

    /// Records how long a successful prediction took
    pub fn record_latency(&self, elapsed: Duration) {
        let key = Key::from_name(LATENCY_METRIC);
        self.recorder.register_histogram(&key).record(elapsed.as_secs_f64());
    }

    /// Renders all metrics in the Prometheus text format. Never mutates counters.
    pub fn snapshot(&self) -> String {
        self.handle.render()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposition::{family_total, sample_value};
    use std::sync::Arc;

    #[test]
    fn test_counters_start_at_zero_and_are_partitioned() {
        let registry = MetricsRegistry::new();
        assert_eq!(family_total(&registry.snapshot(), PREDICTIONS_METRIC), 0.0);

        registry.record_prediction(Sentiment::Positive, "1.0");
        registry.record_prediction(Sentiment::Positive, "1.0");
        registry.record_prediction(Sentiment::Negative, "1.0");
        registry.record_prediction(Sentiment::Positive, "2.0");

        let text = registry.snapshot();
        let positive_v1 = [("prediction", "positive"), ("version", "1.0")];
        let negative_v1 = [("prediction", "negative"), ("version", "1.0")];
        let positive_v2 = [("prediction", "positive"), ("version", "2.0")];

        assert_eq!(sample_value(&text, PREDICTIONS_METRIC, &positive_v1), Some(2.0));
        assert_eq!(sample_value(&text, PREDICTIONS_METRIC, &negative_v1), Some(1.0));
        assert_eq!(sample_value(&text, PREDICTIONS_METRIC, &positive_v2), Some(1.0));
        assert_eq!(family_total(&text, PREDICTIONS_METRIC), 4.0);
    }

    #[test]
    fn test_errors_are_labeled_by_kind() {
        let registry = MetricsRegistry::new();
        registry.record(MetricEvent::ErrorRecorded { kind: ErrorKind::Inference });
        registry.record(MetricEvent::ErrorRecorded { kind: ErrorKind::Validation });
        registry.record(MetricEvent::ErrorRecorded { kind: ErrorKind::Inference });

        let text = registry.snapshot();
        assert_eq!(sample_value(&text, ERRORS_METRIC, &[("kind", "inference_error")]), Some(2.0));
        assert_eq!(sample_value(&text, ERRORS_METRIC, &[("kind", "validation_error")]), Some(1.0));
        assert_eq!(family_total(&text, PREDICTIONS_METRIC), 0.0);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let registry = MetricsRegistry::new();
        registry.record_prediction(Sentiment::Negative, "unknown");
        registry.record_latency(Duration::from_millis(3));

        let first = registry.snapshot();
        let second = registry.snapshot();
        assert_eq!(family_total(&first, PREDICTIONS_METRIC), 1.0);
        assert_eq!(family_total(&second, PREDICTIONS_METRIC), 1.0);
        assert!(first.contains("# HELP predict_requests_total"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = MetricsRegistry::new();
        let b = MetricsRegistry::new();
        a.record_prediction(Sentiment::Positive, "1.0");

        assert_eq!(family_total(&a.snapshot(), PREDICTIONS_METRIC), 1.0);
        assert_eq!(family_total(&b.snapshot(), PREDICTIONS_METRIC), 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let registry = Arc::new(MetricsRegistry::new());

        let tasks: Vec<_> = (0..100)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let label = if i % 3 == 0 { Sentiment::Negative } else { Sentiment::Positive };
                    for _ in 0..10 {
                        registry.record_prediction(label, "1.0");
                    }
                })
            })
            .collect();
        futures::future::join_all(tasks).await;

        assert_eq!(family_total(&registry.snapshot(), PREDICTIONS_METRIC), 1000.0);
    }
}
