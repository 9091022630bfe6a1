use std::fmt;
use std::hash::{Hash, Hasher};

use arbor_core::event::EventSource;
use async_trait::async_trait;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

/// Delivers every item of a stream until it ends. Identity is `key`.
pub struct FromStream<T> {
    key: String,
    stream: BoxStream<'static, T>,
}

impl<T> FromStream<T> {
    pub fn new<S>(key: impl Into<String>, stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self {
            key: key.into(),
            stream: stream.boxed(),
        }
    }
}

impl<T> Hash for FromStream<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for FromStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromStream").field("key", &self.key).finish()
    }
}

#[async_trait]
impl<T: Send + 'static> EventSource for FromStream<T> {
    type Event = T;

    async fn next_event(&mut self) -> Option<T> {
        self.stream.next().await
    }
}

/// Delivers values published on a broadcast channel. Identity is `key`.
///
/// A receiver that falls behind skips the values it missed and carries on
/// with the oldest one still buffered. The source ends when every sender is
/// dropped.
pub struct FromBroadcast<T> {
    key: String,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> FromBroadcast<T> {
    pub fn new(key: impl Into<String>, rx: broadcast::Receiver<T>) -> Self {
        Self { key: key.into(), rx }
    }

    /// Subscribe to `sender`; only values sent after this call are seen.
    pub fn subscribe(key: impl Into<String>, sender: &broadcast::Sender<T>) -> Self {
        Self::new(key, sender.subscribe())
    }
}

impl<T> Hash for FromBroadcast<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for FromBroadcast<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromBroadcast").field("key", &self.key).finish()
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> EventSource for FromBroadcast<T> {
    type Event = T;

    async fn next_event(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(key = %self.key, skipped, "broadcast subscription lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
