//! HTTP API of the sentiment model service
//!
//! This crate binds the inference engine, the metrics registry and the
//! version resolver into the `/predict`, `/version`, `/health` and
//! `/metrics` endpoints.

pub mod error;
pub mod state;
pub mod validation;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod rest;

// Re-export commonly used types
pub use error::ApiError;
pub use rest::RestAPI;
pub use routes::router;
pub use state::AppState;
