//! Service version resolution
//!
//! The version reported by `/version` comes from configuration when it is set.
//! Otherwise the most recent tag of an external registry is used, and
//! `"unknown"` whenever the registry cannot answer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use common::error::{Error, Result};
use common::types::UNKNOWN_VERSION;
use service_config::RegistryConfig;

/// Source of release tags, most recent first
#[async_trait]
pub trait TagRegistry: Send + Sync {
    /// Returns the name of the most recent tag
    async fn latest_tag(&self) -> Result<String>;
}

/// One entry of a tag or release listing
#[derive(Debug, Deserialize)]
struct RegistryTag {
    name: Option<String>,
}

/// Tag registry backed by an HTTP listing endpoint returning a JSON array of
/// objects with a `name` field, ordered newest first.
pub struct HttpTagRegistry {
    /// HTTP client
    client: Client,

    /// Listing endpoint
    url: String,
}

impl HttpTagRegistry {
    /// Creates a registry client whose requests are bounded by `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("model-service/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TagRegistry for HttpTagRegistry {
    async fn latest_tag(&self) -> Result<String> {
        let resp = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::RegistryUnavailable(format!("{}: {}", self.url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::RegistryUnavailable(format!("{}: HTTP {}", self.url, status)));
        }

        let tags: Vec<RegistryTag> = resp
            .json()
            .await
            .map_err(|e| Error::RegistryUnavailable(format!("malformed tag listing: {}", e)))?;

        tags.into_iter()
            .next()
            .and_then(|tag| tag.name)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::RegistryUnavailable("tag listing has no named entry".to_string()))
    }
}

struct CachedVersion {
    version: String,
    resolved_at: Instant,
}

/// Resolves the service version
pub struct VersionResolver {
    /// Version from configuration, takes precedence over the registry
    configured: Option<String>,

    /// External registry consulted when nothing is configured
    registry: Option<Arc<dyn TagRegistry>>,

    /// How long a registry answer is reused
    cache_ttl: Duration,

    /// Last registry answer
    cache: RwLock<Option<CachedVersion>>,
}

impl VersionResolver {
    /// Creates a resolver from an optional configured version and an optional registry
    pub fn new(
        configured: Option<String>,
        registry: Option<Arc<dyn TagRegistry>>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            configured: configured.filter(|v| !v.trim().is_empty()),
            registry,
            cache_ttl,
            cache: RwLock::new(None),
        }
    }

    /// Creates a resolver from configuration, with an HTTP registry if one is configured
    pub fn from_config(configured: Option<String>, registry: &RegistryConfig) -> Result<Self> {
        let client = match &registry.url {
            Some(url) => Some(Arc::new(HttpTagRegistry::new(url.clone(), registry.timeout)?) as Arc<dyn TagRegistry>),
            None => None,
        };

        Ok(Self::new(configured, client, registry.cache_ttl))
    }

    /// Resolves the current version. Never fails.
    pub async fn resolve_version(&self) -> String {
        if let Some(version) = &self.configured {
            return version.clone();
        }

        let registry = match &self.registry {
            Some(registry) => registry,
            None => return UNKNOWN_VERSION.to_string(),
        };

        if let Some(version) = self.cached() {
            return version;
        }

        match registry.latest_tag().await {
            Ok(version) => {
                debug!("Resolved version {} from registry", version);
                if !self.cache_ttl.is_zero() {
                    *self.cache.write() = Some(CachedVersion {
                        version: version.clone(),
                        resolved_at: Instant::now(),
                    });
                }
                version
            }
            Err(e) => {
                warn!("Falling back to '{}' version: {}", UNKNOWN_VERSION, e);
                UNKNOWN_VERSION.to_string()
            }
        }
    }

    fn cached(&self) -> Option<String> {
        if self.cache_ttl.is_zero() {
            return None;
        }

        self.cache
            .read()
            .as_ref()
            .filter(|cached| cached.resolved_at.elapsed() < self.cache_ttl)
            .map(|cached| cached.version.clone())
    }
}
