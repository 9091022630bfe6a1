//! Runtime configuration.
//!
//! Loaded from TOML (optionally named by `ARBOR_CONFIG`) and then adjusted by
//! `ARBOR_*` environment overrides:
//!
//! ```toml
//! stale_sink = "ignore"
//!
//! [timeline]
//! enabled = true
//! capacity = 256
//!
//! [log]
//! filter = "info,arbor_runtime=trace"
//! format = "json"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_PATH_ENV: &str = "ARBOR_CONFIG";
pub const STALE_SINK_ENV: &str = "ARBOR_STALE_SINK";
pub const TIMELINE_ENV: &str = "ARBOR_TIMELINE";
pub const TIMELINE_CAPACITY_ENV: &str = "ARBOR_TIMELINE_CAPACITY";
pub const LOG_FILTER_ENV: &str = "ARBOR_LOG";
pub const LOG_FORMAT_ENV: &str = "ARBOR_LOG_FORMAT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// What `Sink::send` does once its node instance is gone.
    pub stale_sink: StaleSinkPolicy,
    pub timeline: TimelineConfig,
    pub log: LogConfig,
}

/// Contract for sinks whose node instance has been unmounted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleSinkPolicy {
    /// `send` returns `SinkError::Stale`.
    #[default]
    Error,
    /// `send` silently succeeds without enqueueing anything.
    Ignore,
}

impl FromStr for StaleSinkPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "ignore" => Ok(Self::Ignore),
            _ => Err(ConfigError::InvalidValue {
                field: "stale_sink",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineConfig {
    pub enabled: bool,
    /// Maximum retained events; the oldest are dropped first.
    pub capacity: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` still takes precedence.
    pub filter: Option<String>,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                field: "log.format",
                value: s.to_string(),
            }),
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Read the file named by `ARBOR_CONFIG` (defaults when unset), then apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        base.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `ARBOR_*` overrides resolved through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup(STALE_SINK_ENV) {
            self.stale_sink = policy.parse()?;
        }
        if let Some(enabled) = lookup(TIMELINE_ENV) {
            self.timeline.enabled = parse_bool(TIMELINE_ENV, &enabled)?;
        }
        if let Some(capacity) = lookup(TIMELINE_CAPACITY_ENV) {
            self.timeline.capacity =
                capacity
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "timeline.capacity",
                        value: capacity.clone(),
                    })?;
        }
        if let Some(filter) = lookup(LOG_FILTER_ENV) {
            self.log.filter = Some(filter);
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            self.log.format = format.parse()?;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.timeline.enabled && self.timeline.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeline.capacity",
                value: "0".to_string(),
            });
        }
        Ok(self)
    }
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field,
            value: value.to_string(),
        }),
    }
}
