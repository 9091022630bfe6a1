//! # Telemetry: Tracing Subscriber Setup
//!
//! The runtime only emits `tracing` events and spans; installing a subscriber
//! is the host binary's job. These helpers build one from [`LogConfig`].

use crate::config::{LogConfig, LogFormat};
use crate::error::TelemetryError;
use tracing_subscriber::EnvFilter;

/// Directives used when neither `RUST_LOG` nor the config names a filter.
pub const DEFAULT_FILTER: &str = "info,arbor_runtime=debug";

/// Resolve the filter: `RUST_LOG` first, then `config.filter`, then [`DEFAULT_FILTER`].
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = config.filter.as_deref().unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directives).map_err(|e| TelemetryError::Filter(e.to_string()))
}

/// Install a global fmt subscriber for the configured format.
pub fn init_tracing(config: &LogConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| TelemetryError::Install(e.to_string()))
}

/// Initialize a simple stdout tracing subscriber for development.
///
/// Ignores the error when a subscriber is already installed.
pub fn init_stdout_tracing() {
    if let Err(e) = init_tracing(&LogConfig::default()) {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}
