//! Artifact downloader implementation
//!
//! This module acquires artifacts before the service starts: local files are
//! used as they are, remote files are downloaded once into their cache path.
//! Downloads stream into a temporary `.download` file which is renamed into
//! place only after the whole body was written and verified.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use common::error::{Error, Result};
use common::utils::{format_bytes, format_duration};

use crate::source::ArtifactSource;

/// Artifact store resolving artifacts to readable local files
pub struct ArtifactStore {
    /// HTTP client
    client: Client,

    /// Number of network fetches performed
    fetches: AtomicU64,
}

impl ArtifactStore {
    /// Creates a new artifact store whose downloads are bounded by `download_timeout`
    pub fn new(download_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("model-service/", env!("CARGO_PKG_VERSION")))
            .timeout(download_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            fetches: AtomicU64::new(0),
        })
    }

    /// Resolves an artifact to a local path.
    ///
    /// Local sources must already exist. Remote sources are fetched only if
    /// their cache path does not exist yet, so repeated calls are
    /// filesystem-only checks.
    pub async fn acquire(&self, source: &ArtifactSource) -> Result<PathBuf> {
        match source {
            ArtifactSource::Local { name, path } => {
                if tokio::fs::try_exists(path).await.unwrap_or(false) {
                    debug!("Using local {} artifact at {}", name, path.display());
                    Ok(path.clone())
                } else {
                    Err(Error::acquisition(
                        path.display().to_string(),
                        format!("local {} artifact does not exist", name),
                    ))
                }
            }
            ArtifactSource::Remote { name, url, cache_path, sha256 } => {
                if tokio::fs::try_exists(cache_path).await.unwrap_or(false) {
                    info!("Using cached {} artifact at {}", name, cache_path.display());
                    return Ok(cache_path.clone());
                }

                info!("Downloading {} artifact from {}", name, url);
                let start = Instant::now();

                let size = self
                    .download(url, cache_path, sha256.as_deref())
                    .await
                    .map_err(|e| {
                        error!("Download of {} artifact from {} failed: {}", name, url, e);
                        match e {
                            Error::ArtifactAcquisition { .. } => e,
                            other => Error::acquisition(url.clone(), other),
                        }
                    })?;

                info!(
                    "Downloaded {} artifact ({}) to {} in {}",
                    name,
                    format_bytes(size),
                    cache_path.display(),
                    format_duration(start.elapsed())
                );

                Ok(cache_path.clone())
            }
        }
    }

    /// Number of network fetches performed so far
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Downloads `url` into `path`, returning the number of bytes written
    async fn download(&self, url: &str, path: &Path, expected_sha256: Option<&str>) -> Result<u64> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let download_path = partial_path(path);

        let result = self.download_file(url, &download_path, expected_sha256).await;

        match result {
            Ok(size) => {
                // Rename download file to final file
                tokio::fs::rename(&download_path, path).await?;
                Ok(size)
            }
            Err(e) => {
                // Clean up download file
                let _ = tokio::fs::remove_file(&download_path).await;
                Err(e)
            }
        }
    }

    async fn download_file(&self, url: &str, path: &Path, expected_sha256: Option<&str>) -> Result<u64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::acquisition(url, e))?;

        if !resp.status().is_success() {
            return Err(Error::acquisition(url, format!("HTTP {}", resp.status())));
        }

        let mut file = File::create(path).await?;
        let mut hasher = expected_sha256.map(|_| Sha256::new());

        let mut stream = resp.bytes_stream();
        let mut downloaded = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::acquisition(url, e))?;

            file.write_all(&chunk).await?;
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&chunk);
            }
            downloaded += chunk.len() as u64;
        }

        // Flush and close file
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let (Some(hasher), Some(expected)) = (hasher, expected_sha256) {
            let actual = hex::encode(hasher.finalize());
            if actual != expected {
                return Err(Error::acquisition(
                    url,
                    format!("checksum mismatch: expected {}, got {}", expected, actual),
                ));
            }
            debug!("Checksum verified for {}", url);
        }

        Ok(downloaded)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".download");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    const BODY: &str = r#"{"type": "logistic_regression", "coef": [1.0], "intercept": 0.0}"#;

    async fn artifact(State(hits): State<Arc<AtomicUsize>>) -> &'static str {
        hits.fetch_add(1, Ordering::SeqCst);
        BODY
    }

    async fn missing(State(hits): State<Arc<AtomicUsize>>) -> StatusCode {
        hits.fetch_add(1, Ordering::SeqCst);
        StatusCode::NOT_FOUND
    }

    async fn serve(hits: Arc<AtomicUsize>) -> SocketAddr {
        let app = Router::new()
            .route("/model.json", get(artifact))
            .route("/missing.json", get(missing))
            .with_state(hits);

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(app.into_make_service())
                .await
                .unwrap();
        });
        addr
    }

    fn store() -> ArtifactStore {
        ArtifactStore::new(Duration::from_secs(10)).unwrap()
    }

    fn remote(url: String, cache_path: PathBuf, sha256: Option<String>) -> ArtifactSource {
        ArtifactSource::Remote {
            name: "model".to_string(),
            url,
            cache_path,
            sha256,
        }
    }

    #[tokio::test]
    async fn test_local_artifact_is_returned_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, BODY).unwrap();

        let store = store();
        let source = ArtifactSource::Local { name: "model".into(), path: path.clone() };

        assert_eq!(store.acquire(&source).await.unwrap(), path);
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_local_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = ArtifactSource::Local {
            name: "vectorizer".into(),
            path: dir.path().join("absent.json"),
        };

        let err = store().acquire(&source).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("absent.json"));
    }

    #[tokio::test]
    async fn test_remote_artifact_is_fetched_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = serve(hits.clone()).await;
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("nested").join("cache").join("model.json");

        let store = store();
        let source = remote(format!("http://{}/model.json", addr), cache_path.clone(), None);

        let first = store.acquire(&source).await.unwrap();
        let second = store.acquire(&source).await.unwrap();

        assert_eq!(first, cache_path);
        assert_eq!(second, cache_path);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(store.fetch_count(), 1);
        assert_eq!(std::fs::read_to_string(&cache_path).unwrap(), BODY);
        assert!(!partial_path(&cache_path).exists());
    }

    #[tokio::test]
    async fn test_http_error_status_fails_without_leaving_files() {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = serve(hits.clone()).await;
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("missing.json");

        let url = format!("http://{}/missing.json", addr);
        let err = store()
            .acquire(&remote(url.clone(), cache_path.clone(), None))
            .await
            .unwrap_err();

        match err {
            Error::ArtifactAcquisition { location, .. } => assert_eq!(location, url),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!cache_path.exists());
        assert!(!partial_path(&cache_path).exists());
    }

    #[tokio::test]
    async fn test_unreachable_host_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = remote(
            "http://127.0.0.1:1/model.json".to_string(),
            dir.path().join("model.json"),
            None,
        );

        let err = store().acquire(&source).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_checksum_is_verified() {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = serve(hits).await;
        let dir = tempfile::tempdir().unwrap();
        let url = format!("http://{}/model.json", addr);

        let wrong = remote(url.clone(), dir.path().join("bad.json"), Some("0".repeat(64)));
        assert!(store().acquire(&wrong).await.is_err());
        assert!(!dir.path().join("bad.json").exists());

        let expected = hex::encode(Sha256::digest(BODY.as_bytes()));
        let right = remote(url, dir.path().join("good.json"), Some(expected));
        assert!(store().acquire(&right).await.is_ok());
    }
}
