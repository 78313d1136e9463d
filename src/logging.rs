//! Structured logging via `tracing`.
//!
//! Logs go to stderr; stdout carries the sequence output (banners, step
//! headers, show-commands listings) and stays machine-pipeable.

use crate::config::LoggingConfig;
use crate::error::OpsError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable overriding the configured filter, e.g.
/// `SPIRE_LOG=spire::sequence=debug`.
pub const LOG_ENV: &str = "SPIRE_LOG";

/// Initialize the global subscriber. `SPIRE_LOG` takes priority over the
/// configured level. Errors if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), OpsError> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let base = Registry::default().with(filter);
    let result = if config.format == "json" {
        base.with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
    } else {
        base.with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
    };
    result.map_err(|e| OpsError::Config(format!("cannot initialize logging: {e}")))
}
