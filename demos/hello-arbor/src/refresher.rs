use std::hash::{Hash, Hasher};
use std::time::Duration;

use arbor::core::EventSource;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh failed: {0}")]
    Failed(String),
}

/// Simulated network refresh: answers once after `delay`.
#[derive(Debug)]
pub struct Refresher {
    delay: Duration,
    result: Option<Result<String, RefreshError>>,
}

impl Refresher {
    pub fn new(delay: Duration) -> Self {
        Self::with_result(delay, Ok("We did it!".to_string()))
    }

    pub fn with_result(delay: Duration, result: Result<String, RefreshError>) -> Self {
        Self {
            delay,
            result: Some(result),
        }
    }
}

impl Hash for Refresher {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.delay.hash(state);
    }
}

#[async_trait]
impl EventSource for Refresher {
    type Event = Result<String, RefreshError>;

    async fn next_event(&mut self) -> Option<Self::Event> {
        let result = self.result.take()?;
        tokio::time::sleep(self.delay).await;
        tracing::debug!(ok = result.is_ok(), "refresh finished");
        Some(result)
    }
}
