//! Logging for the sentiment model service
//!
//! Structured logging through `tracing`. Output goes to stdout through a
//! non-blocking writer, either as text lines or as JSON objects.

use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use common::error::{Error, Result};
use service_config::{LogFormat, LogSettings};

/// Builds the event filter.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn env_filter(settings: &LogSettings) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", settings.level, e))),
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes buffered log lines when dropped and must be
/// held for the lifetime of the process.
pub fn init(settings: &LogSettings) -> Result<WorkerGuard> {
    let filter = env_filter(settings)?;
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer);

    let installed = match settings.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.map_err(|e| Error::Internal(format!("Failed to install log subscriber: {}", e)))?;

    debug!(format = ?settings.format, "Logging initialized");

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_config_error() {
        let settings = LogSettings {
            level: "model_service=loud".to_string(),
            format: LogFormat::Text,
        };

        if std::env::var("RUST_LOG").is_err() {
            let err = env_filter(&settings).unwrap_err();
            assert!(err.is_fatal());
        }
    }

    #[test]
    fn test_level_directive_is_accepted() {
        let settings = LogSettings {
            level: "model_service=debug,info".to_string(),
            format: LogFormat::Json,
        };
        assert!(env_filter(&settings).is_ok());
    }
}
