use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// Represents a discrete event in the runtime's execution timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEvent {
    /// A render pass over the whole tree finished
    RenderPass { pass: u64, timestamp: i64 },
    /// A node instance was created at a tree position
    NodeMounted {
        node_id: Uuid,
        workflow: String,
        key: String,
        timestamp: i64,
    },
    /// A node instance was destroyed
    NodeUnmounted {
        node_id: Uuid,
        workflow: String,
        timestamp: i64,
    },
    /// An action was applied to a node's state
    ActionApplied {
        node_id: Uuid,
        workflow: String,
        timestamp: i64,
    },
    /// A node reported an output to its parent (or the host, for the root)
    OutputEmitted {
        node_id: Uuid,
        workflow: String,
        timestamp: i64,
    },
    SubscriptionStarted {
        node_id: Uuid,
        subscription: String,
        timestamp: i64,
    },
    SubscriptionCancelled {
        node_id: Uuid,
        subscription: String,
        timestamp: i64,
    },
    /// A queued action or event arrived after its target went away
    StaleActionDropped { node_id: Uuid, timestamp: i64 },
}

impl TimelineEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            TimelineEvent::RenderPass { timestamp, .. }
            | TimelineEvent::NodeMounted { timestamp, .. }
            | TimelineEvent::NodeUnmounted { timestamp, .. }
            | TimelineEvent::ActionApplied { timestamp, .. }
            | TimelineEvent::OutputEmitted { timestamp, .. }
            | TimelineEvent::SubscriptionStarted { timestamp, .. }
            | TimelineEvent::SubscriptionCancelled { timestamp, .. }
            | TimelineEvent::StaleActionDropped { timestamp, .. } => *timestamp,
        }
    }
}

/// Current wall-clock time in milliseconds, the unit used by timeline events.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A bounded, sequential record of a runtime session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    capacity: usize,
    pub events: VecDeque<TimelineEvent>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::new(),
        }
    }

    /// Append an event, dropping the oldest once at capacity.
    pub fn push(&mut self, event: TimelineEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events.iter()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Shared handle used by the runtime to append to a [`Timeline`].
#[derive(Debug, Clone)]
pub struct TimelineRecorder {
    inner: Arc<Mutex<Timeline>>,
}

impl TimelineRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Timeline::with_capacity(capacity))),
        }
    }

    pub fn record(&self, event: TimelineEvent) {
        self.inner.lock().push(event);
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Timeline {
        self.inner.lock().clone()
    }
}
