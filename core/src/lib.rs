//! Arbor Core - typed contracts shared by the runtime and its extensions.
//!
//! This crate is executor-agnostic: no tokio, no task spawning.

pub mod config;
pub mod error;
pub mod event;
pub mod hints;
pub mod outcome;
pub mod snapshot;
pub mod telemetry;
pub mod timeline;

pub use config::{LogConfig, LogFormat, RuntimeConfig, StaleSinkPolicy, TimelineConfig};
pub use error::{ConfigError, SinkError, TelemetryError};
pub use event::{EventSource, SourceIdentity};
pub use hints::{HintKey, Hints, KeyId};
pub use outcome::Outcome;
pub use snapshot::{NodeSnapshot, TreeSnapshot};
pub use timeline::{Timeline, TimelineEvent, TimelineRecorder};

pub mod prelude {
    pub use crate::event::EventSource;
    pub use crate::hint_key;
    pub use crate::hints::{HintKey, Hints};
    pub use crate::outcome::Outcome;
    pub use crate::{RuntimeConfig, SinkError};
}
