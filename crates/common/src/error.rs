//! Error types for the common crate
//!
//! This module defines the error taxonomy shared by every crate of the service.
//! Startup errors (`Config`, `ArtifactAcquisition`, `ArtifactLoad`) are fatal;
//! request errors are mapped to status codes at the HTTP boundary.

use std::fmt;
use thiserror::Error;

/// Result type for model service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error used to carry an underlying cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Common error type for model service operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// An artifact could not be fetched or cached
    #[error("Failed to acquire artifact from {location}: {source}")]
    ArtifactAcquisition {
        /// Path or URL the artifact was requested from
        location: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// An artifact payload is missing, corrupt or has an unexpected shape
    #[error("Failed to load artifact {path}: {reason}")]
    ArtifactLoad {
        /// Local path of the artifact
        path: String,
        /// What was wrong with the payload
        reason: String,
    },

    /// Malformed or empty client request
    #[error("Validation error: {0}")]
    Validation(String),

    /// A collaborator failed while producing a prediction
    #[error("Inference failed during {stage}: {source}")]
    Inference {
        /// Pipeline stage that failed
        stage: &'static str,
        /// Collaborator error
        #[source]
        source: BoxError,
    },

    /// The version registry could not be queried
    #[error("Version registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates an artifact acquisition error for the given location
    pub fn acquisition(location: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::ArtifactAcquisition {
            location: location.into(),
            source: source.into(),
        }
    }

    /// Creates an artifact load error for the given path
    pub fn artifact_load(path: impl fmt::Display, reason: impl Into<String>) -> Self {
        Error::ArtifactLoad {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Wraps a collaborator failure raised during the given pipeline stage
    pub fn inference(stage: &'static str, source: impl Into<BoxError>) -> Self {
        Error::Inference {
            stage,
            source: source.into(),
        }
    }

    /// Returns the machine-readable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::ArtifactAcquisition { .. } => ErrorKind::ArtifactAcquisition,
            Error::ArtifactLoad { .. } => ErrorKind::ArtifactLoad,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Inference { .. } => ErrorKind::Inference,
            Error::RegistryUnavailable(_) => ErrorKind::RegistryUnavailable,
            Error::Io(_) | Error::Serialization(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the error must abort the process during startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Config | ErrorKind::ArtifactAcquisition | ErrorKind::ArtifactLoad
        )
    }
}

/// Stable identifier of an error category.
///
/// Used as the `kind` label of the error counter and as the `details`
/// field of internal-error response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    ArtifactAcquisition,
    ArtifactLoad,
    Validation,
    Inference,
    RegistryUnavailable,
    Internal,
}

impl ErrorKind {
    /// Returns the snake_case name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config_error",
            ErrorKind::ArtifactAcquisition => "artifact_acquisition_error",
            ErrorKind::ArtifactLoad => "artifact_load_error",
            ErrorKind::Validation => "validation_error",
            ErrorKind::Inference => "inference_error",
            ErrorKind::RegistryUnavailable => "registry_unavailable_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_errors_are_fatal() {
        assert!(Error::Config("missing MODEL_PATH".into()).is_fatal());
        assert!(Error::artifact_load("model.json", "truncated").is_fatal());
        assert!(Error::acquisition("http://host/model.json", "connection refused").is_fatal());

        assert!(!Error::Validation("empty review".into()).is_fatal());
        assert!(!Error::inference("vectorize", "dimension mismatch").is_fatal());
    }

    #[test]
    fn test_inference_error_keeps_cause() {
        let err = Error::inference("classify", "non-finite score");

        assert_eq!(err.kind(), ErrorKind::Inference);
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("non-finite score"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::Inference.to_string(), "inference_error");
        assert_eq!(Error::Io(std::io::ErrorKind::NotFound.into()).kind(), ErrorKind::Internal);
    }
}
