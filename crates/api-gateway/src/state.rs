//! Shared state handed to every request handler

use std::sync::Arc;

use inference_engine::EngineHandle;
use model_manager::VersionResolver;
use performance_monitor::MetricsRegistry;

/// Process-wide handles. Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct AppState {
    /// Loaded inference engine
    pub engine: EngineHandle,

    /// Prometheus counters
    pub metrics: Arc<MetricsRegistry>,

    /// Resolver behind `/version`
    pub versions: Arc<VersionResolver>,

    /// Version attached to predictions and their metric labels
    pub service_version: Arc<str>,
}

impl AppState {
    pub fn new(
        engine: EngineHandle,
        metrics: Arc<MetricsRegistry>,
        versions: Arc<VersionResolver>,
        service_version: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            engine,
            metrics,
            versions,
            service_version: service_version.into(),
        }
    }
}
