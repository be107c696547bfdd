//! Sentiment model service
//!
//! Wires the workspace crates together: configuration is validated, the
//! model and vectorizer artifacts are acquired and loaded, and only then is
//! the HTTP API built. A service that fails any of these steps never binds
//! its port.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use axum::Router;
use tracing::info;

use api_gateway::{AppState, RestAPI};
use common::utils::format_duration;
use inference_engine::InferenceEngine;
use model_manager::{ArtifactSource, ArtifactStore, VersionResolver};
use performance_monitor::MetricsRegistry;
use service_config::ServiceConfig;

/// A fully initialized service, ready to bind
pub struct ModelService {
    /// Validated configuration
    config: ServiceConfig,

    /// Handles shared with the request handlers
    state: AppState,
}

impl ModelService {
    /// Runs the startup sequence.
    ///
    /// Artifacts are acquired one after the other (model first), then loaded
    /// on a blocking thread. Every error returned here is fatal.
    pub async fn bootstrap(config: ServiceConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Starting model service v{}", env!("CARGO_PKG_VERSION"));

        let store = ArtifactStore::new(config.download_timeout)?;

        let model_source = ArtifactSource::from_config(&config.model, &config.artifact_cache_dir);
        let model_path = store
            .acquire(&model_source)
            .await
            .with_context(|| format!("failed to acquire {}", model_source))?;

        let vectorizer_source = ArtifactSource::from_config(&config.vectorizer, &config.artifact_cache_dir);
        let vectorizer_path = store
            .acquire(&vectorizer_source)
            .await
            .with_context(|| format!("failed to acquire {}", vectorizer_source))?;

        let engine = tokio::task::spawn_blocking(move || InferenceEngine::load(&model_path, &vectorizer_path))
            .await
            .map_err(|e| anyhow!("artifact loading task failed: {}", e))?
            .context("failed to load artifacts")?;

        let versions = VersionResolver::from_config(config.configured_version.clone(), &config.registry)?;

        let state = AppState::new(
            Arc::new(engine),
            Arc::new(MetricsRegistry::new()),
            Arc::new(versions),
            config.service_version(),
        );

        info!(
            "Model service initialized in {} (version {})",
            format_duration(start.elapsed()),
            config.service_version()
        );

        Ok(Self { config, state })
    }

    /// Builds the HTTP router
    pub fn router(&self) -> Router {
        api_gateway::router(self.state.clone(), self.config.request_timeout)
    }

    /// Binds the configured address
    pub async fn bind(&self) -> Result<RestAPI> {
        let address = self.config.bind_address();
        let addr = resolve(&address).await?;
        Ok(RestAPI::bind(addr, self.router())?)
    }

    /// Serves requests until `shutdown` completes
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let server = self.bind().await?;
        server.run(shutdown).await?;
        Ok(())
    }
}

async fn resolve(address: &str) -> Result<SocketAddr> {
    tokio::net::lookup_host(address)
        .await
        .with_context(|| format!("invalid bind address {}", address))?
        .next()
        .ok_or_else(|| anyhow!("bind address {} resolved to nothing", address))
}
