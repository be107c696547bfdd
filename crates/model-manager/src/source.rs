//! Artifact locations
//!
//! An artifact is either a file already present on disk or a remote file
//! that is downloaded once into a local cache path.

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use service_config::ArtifactConfig;

/// Where an artifact is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// File on the local filesystem
    Local {
        /// Artifact name
        name: String,
        /// Path of the file
        path: PathBuf,
    },

    /// File fetched over HTTP and cached locally
    Remote {
        /// Artifact name
        name: String,
        /// URL to fetch
        url: String,
        /// Where the downloaded file is kept
        cache_path: PathBuf,
        /// Expected SHA-256 of the body (lowercase hex)
        sha256: Option<String>,
    },
}

impl ArtifactSource {
    /// Resolves a configured artifact into a source.
    ///
    /// A URL always wins. If a path is configured alongside the URL it is
    /// used as the cache path, otherwise one is derived under `cache_dir`.
    pub fn from_config(config: &ArtifactConfig, cache_dir: &Path) -> Self {
        match (&config.url, &config.path) {
            (Some(url), path) => ArtifactSource::Remote {
                name: config.name.to_string(),
                url: url.clone(),
                cache_path: path
                    .clone()
                    .unwrap_or_else(|| cache_path_for(config.name, url, cache_dir)),
                sha256: config.sha256.clone(),
            },
            (None, Some(path)) => ArtifactSource::Local {
                name: config.name.to_string(),
                path: path.clone(),
            },
            // Rejected by config validation; an empty local path fails acquisition
            (None, None) => ArtifactSource::Local {
                name: config.name.to_string(),
                path: PathBuf::new(),
            },
        }
    }

    /// Artifact name
    pub fn name(&self) -> &str {
        match self {
            ArtifactSource::Local { name, .. } | ArtifactSource::Remote { name, .. } => name,
        }
    }

    /// Path or URL, for error reporting
    pub fn location(&self) -> String {
        match self {
            ArtifactSource::Local { path, .. } => path.display().to_string(),
            ArtifactSource::Remote { url, .. } => url.clone(),
        }
    }
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.location())
    }
}

/// Computes the cache path of a remote artifact.
///
/// The path embeds a digest of the full URL so that two URLs ending in the
/// same file name never share a cache entry.
pub fn cache_path_for(name: &str, url: &str, cache_dir: &Path) -> PathBuf {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    cache_dir.join(format!("{}-{}-{}", name, &digest[..12], file_name_of(url)))
}

fn file_name_of(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let scheme_stripped = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);

    let last = scheme_stripped
        .split_once('/')
        .map(|(_, path)| path.rsplit('/').next().unwrap_or(""))
        .unwrap_or("");

    let sanitized: String = last
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "artifact".to_string()
    } else {
        sanitized
    }
}
