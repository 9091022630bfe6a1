use async_trait::async_trait;
use serde::Serialize;
use std::any::TypeId;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::hints::short_type_name;

/// Represents a source of events (e.g., Timer, Network call, Platform callback).
///
/// A subscription wraps an `EventSource`: the runtime starts pulling events when
/// the subscription is first declared and stops (drops the source) when a render
/// pass no longer declares it. Failures are events too; a network source should
/// yield `Result<T, E>` and let the subscriber map the error into an action.
#[async_trait]
pub trait EventSource: Send + 'static {
    type Event: Send + 'static;

    /// Returns the next event, or None if the source is exhausted/closed.
    async fn next_event(&mut self) -> Option<Self::Event>;
}

/// Identity of an event source derived from its configuration.
///
/// Two sources of the same type whose `Hash` output matches are the same
/// subscription: re-declaring it on a later render leaves the running one alone.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceIdentity {
    type_id: TypeId,
    label: &'static str,
    fingerprint: u64,
}

impl SourceIdentity {
    pub fn of<S: Hash + 'static>(source: &S) -> Self {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        Self {
            type_id: TypeId::of::<S>(),
            label: short_type_name::<S>(),
            fingerprint: hasher.finish(),
        }
    }

    /// Readable source type name.
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

impl fmt::Debug for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:016x}", self.label, self.fingerprint)
    }
}

impl Serialize for SourceIdentity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
