//! Common utilities and types for the sentiment model service
//! 
//! This crate provides shared functionality used across the service,
//! including the error taxonomy, the request/response types and utility functions.

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{BoxError, Error, ErrorKind, Result};
pub use types::*;
