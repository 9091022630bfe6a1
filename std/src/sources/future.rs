use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};

use arbor_core::event::EventSource;
use async_trait::async_trait;
use futures_util::future::BoxFuture;

/// Runs a future once and delivers its result.
///
/// Identity is `key` alone. A workflow typically builds a new future on every
/// render; while the key stays the same the running one is kept and the new
/// one is dropped unpolled. Change the key to start over.
pub struct FromFuture<T> {
    key: String,
    future: Option<BoxFuture<'static, T>>,
}

impl<T> FromFuture<T> {
    pub fn new<F>(key: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            key: key.into(),
            future: Some(Box::pin(future)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T> Hash for FromFuture<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for FromFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFuture")
            .field("key", &self.key)
            .field("pending", &self.future.is_some())
            .finish()
    }
}

#[async_trait]
impl<T: Send + 'static> EventSource for FromFuture<T> {
    type Event = T;

    async fn next_event(&mut self) -> Option<T> {
        let future = self.future.take()?;
        Some(future.await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::event::SourceIdentity;

    #[tokio::test]
    async fn test_resolves_once() {
        let mut source = FromFuture::new("answer", async { 42 });

        assert_eq!(source.next_event().await, Some(42));
        assert_eq!(source.next_event().await, None);
    }

    #[test]
    fn test_identity_is_key() {
        let a = SourceIdentity::of(&FromFuture::new("load", async { 1 }));
        let b = SourceIdentity::of(&FromFuture::new("load", async { 2 }));
        let c = SourceIdentity::of(&FromFuture::new("reload", async { 1 }));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
