//! Configuration management for the sentiment model service
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults (embedded in the binary)
//! 2. An optional TOML configuration file
//! 3. Environment variables (`MODEL_PATH`, `MODEL_URL`, `VECTORIZER_PATH`,
//!    `VECTORIZER_URL`, `SERVICE_VERSION`, `PORT`, ...)
//!
//! The resulting [`ServiceConfig`] is validated once and is immutable afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::debug;

use common::error::{Error, Result};
use common::types::UNKNOWN_VERSION;

const DEFAULTS: &str = include_str!("default.toml");

/// Flat settings as read from the configuration sources, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    pub model_path: Option<String>,
    pub model_url: Option<String>,
    pub model_sha256: Option<String>,
    pub vectorizer_path: Option<String>,
    pub vectorizer_url: Option<String>,
    pub vectorizer_sha256: Option<String>,
    pub service_version: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub artifact_cache_dir: Option<String>,
    pub download_timeout_secs: Option<u64>,
    pub version_registry_url: Option<String>,
    pub registry_timeout_secs: Option<u64>,
    pub version_cache_ttl_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

/// Where one artifact comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactConfig {
    /// Artifact name (`model` or `vectorizer`)
    pub name: &'static str,

    /// Local path. With a URL, this is where the download is cached.
    pub path: Option<PathBuf>,

    /// Remote URL to fetch the artifact from
    pub url: Option<String>,

    /// Expected SHA-256 of a downloaded artifact (lowercase hex)
    pub sha256: Option<String>,
}

/// Version registry settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Tag listing endpoint, e.g. `https://api.github.com/repos/<owner>/<repo>/tags`
    pub url: Option<String>,

    /// Bound on a single registry request
    pub timeout: Duration,

    /// How long a resolved version is reused; zero disables caching
    pub cache_ttl: Duration,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

/// Validated, immutable service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Model artifact location
    pub model: ArtifactConfig,

    /// Vectorizer artifact location
    pub vectorizer: ArtifactConfig,

    /// Explicitly configured service version, if any
    pub configured_version: Option<String>,

    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Directory for artifacts downloaded without an explicit path
    pub artifact_cache_dir: PathBuf,

    /// Bound on a single artifact download
    pub download_timeout: Duration,

    /// Version registry settings
    pub registry: RegistryConfig,

    /// Bound on a single HTTP request
    pub request_timeout: Duration,

    /// Logging settings
    pub logging: LogSettings,
}

impl ServiceConfig {
    /// Loads the configuration from the defaults, an optional file and the environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Self::defaults();

        if let Some(path) = config_file {
            debug!("Reading configuration file {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder = builder.add_source(Environment::default());

        Self::build(builder)
    }

    /// Loads the configuration from the defaults and a TOML document, ignoring the environment
    pub fn from_toml(document: &str) -> Result<Self> {
        Self::build(Self::defaults().add_source(File::from_str(document, FileFormat::Toml)))
    }

    fn defaults() -> ConfigBuilder<DefaultState> {
        config::Config::builder().add_source(File::from_str(DEFAULTS, FileFormat::Toml))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let raw: RawSettings = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))?;

        Self::from_raw(raw)
    }

    /// Validates raw settings into a service configuration
    pub fn from_raw(raw: RawSettings) -> Result<Self> {
        let model = artifact("model", raw.model_path, raw.model_url, raw.model_sha256)?;
        let vectorizer = artifact(
            "vectorizer",
            raw.vectorizer_path,
            raw.vectorizer_url,
            raw.vectorizer_sha256,
        )?;

        let registry_url = non_empty(raw.version_registry_url);
        if let Some(url) = &registry_url {
            if !is_http_url(url) {
                return Err(Error::Config(format!(
                    "VERSION_REGISTRY_URL must be an http(s) URL, got {}",
                    url
                )));
            }
        }

        let format = match non_empty(raw.log_format) {
            Some(format) => format.parse::<LogFormat>().map_err(Error::Config)?,
            None => LogFormat::Text,
        };

        Ok(Self {
            model,
            vectorizer,
            configured_version: non_empty(raw.service_version),
            host: non_empty(raw.host).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: raw.port.unwrap_or(8000),
            artifact_cache_dir: non_empty(raw.artifact_cache_dir)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./artifacts")),
            download_timeout: positive_secs("DOWNLOAD_TIMEOUT_SECS", raw.download_timeout_secs, 300)?,
            registry: RegistryConfig {
                url: registry_url,
                timeout: positive_secs("REGISTRY_TIMEOUT_SECS", raw.registry_timeout_secs, 5)?,
                cache_ttl: Duration::from_secs(raw.version_cache_ttl_secs.unwrap_or(0)),
            },
            request_timeout: positive_secs("REQUEST_TIMEOUT_SECS", raw.request_timeout_secs, 30)?,
            logging: LogSettings {
                level: non_empty(raw.log_level).unwrap_or_else(|| "info".to_string()),
                format,
            },
        })
    }

    /// Version reported with predictions and used as metric label
    pub fn service_version(&self) -> &str {
        self.configured_version.as_deref().unwrap_or(UNKNOWN_VERSION)
    }

    /// Socket address string to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ArtifactConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.url, &self.path) {
            (Some(url), Some(path)) => write!(f, "{} ({} -> {})", self.name, url, path.display()),
            (Some(url), None) => write!(f, "{} ({})", self.name, url),
            (None, Some(path)) => write!(f, "{} ({})", self.name, path.display()),
            (None, None) => write!(f, "{} (unset)", self.name),
        }
    }
}

fn artifact(
    name: &'static str,
    path: Option<String>,
    url: Option<String>,
    sha256: Option<String>,
) -> Result<ArtifactConfig> {
    let mut path = non_empty(path);
    let mut url = non_empty(url);

    // A URL given where a path is expected is still a remote location
    if url.is_none() && path.as_deref().map_or(false, is_http_url) {
        url = path.take();
    }

    if path.is_none() && url.is_none() {
        let upper = name.to_uppercase();
        return Err(Error::Config(format!(
            "{}_PATH or {}_URL must be set",
            upper, upper
        )));
    }

    if let Some(url) = &url {
        if !is_http_url(url) {
            return Err(Error::Config(format!(
                "{}_URL must be an http(s) URL, got {}",
                name.to_uppercase(),
                url
            )));
        }
    }

    let sha256 = non_empty(sha256).map(|s| s.to_lowercase());
    if let Some(sum) = &sha256 {
        if sum.len() != 64 || !sum.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Config(format!(
                "{}_SHA256 must be 64 hex characters",
                name.to_uppercase()
            )));
        }
    }

    Ok(ArtifactConfig {
        name,
        path: path.map(PathBuf::from),
        url,
        sha256,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive_secs(key: &str, value: Option<u64>, default: u64) -> Result<Duration> {
    match value.unwrap_or(default) {
        0 => Err(Error::Config(format!("{} must be greater than zero", key))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

/// Returns true if the location is an `http://` or `https://` URL
pub fn is_http_url(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
