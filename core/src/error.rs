use thiserror::Error;
use uuid::Uuid;

/// Failure to deliver an action through a sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The node instance the sink was created for has been unmounted.
    #[error("sink for unmounted workflow node {node} is stale")]
    Stale { node: Uuid },
    /// The host that owned the tree has been dropped.
    #[error("workflow host has shut down")]
    Closed,
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: &'static str, value: String },
}

/// Tracing subscriber initialisation errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}
