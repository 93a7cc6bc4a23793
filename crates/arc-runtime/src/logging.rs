//! Structured logging setup.
//!
//! Every crate in the workspace logs through `tracing` with structured
//! fields (`topic`, `tx_count`, `key`, `stream`, ...). This module installs
//! the global subscriber that renders them, either human-readable or as
//! JSON lines.

use crate::config::ArcConfig;
use crate::errors::ArcError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter: `RUST_LOG` when set, otherwise the configured level.
///
/// # Errors
///
/// `ArcError::Logging` if neither is a valid filter directive.
pub fn env_filter(config: &ArcConfig) -> Result<EnvFilter, ArcError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| ArcError::Logging(e.to_string()))
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// `ArcError::Logging` if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: &ArcConfig) -> Result<(), ArcError> {
    let filter = env_filter(config)?;

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| ArcError::Logging(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| ArcError::Logging(e.to_string()))?;
    }

    tracing::info!(
        network = %config.network,
        level = %config.log_level,
        json = config.json_logs,
        "Arc client logging initialized"
    );
    Ok(())
}
