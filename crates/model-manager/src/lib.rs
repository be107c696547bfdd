//! Artifact lifecycle management for the sentiment model service
//!
//! This crate resolves where the model and vectorizer artifacts live,
//! downloads remote artifacts into a local cache, and resolves the
//! service version reported by `/version`.

pub mod source;
pub mod downloader;
pub mod versioning;

// Re-export commonly used types
pub use source::ArtifactSource;
pub use downloader::ArtifactStore;
pub use versioning::{HttpTagRegistry, TagRegistry, VersionResolver};
