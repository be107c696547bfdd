//! Reading serialized artifacts from disk

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use common::error::{Error, Result};
use common::utils::format_bytes;

/// Reads and decodes a JSON artifact.
///
/// Every failure, including a missing file, is reported as an artifact load error.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|e| Error::artifact_load(path.display(), e.to_string()))?;

    debug!("Read {} from {}", format_bytes(bytes.len() as u64), path.display());

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::artifact_load(path.display(), format!("corrupt payload: {}", e)))
}
