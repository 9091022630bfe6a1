use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use arbor_core::event::EventSource;
use async_trait::async_trait;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Ticks every `period`; the first tick comes one period after the
/// subscription starts. Identity is the period.
pub struct Every {
    period: Duration,
    interval: Option<Interval>,
}

impl Every {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Hash for Every {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.period.hash(state);
    }
}

impl fmt::Debug for Every {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Every").field("period", &self.period).finish()
    }
}

#[async_trait]
impl EventSource for Every {
    type Event = Instant;

    async fn next_event(&mut self) -> Option<Instant> {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        Some(interval.tick().await)
    }
}

/// Yields `value` once, `delay` after the subscription starts.
#[derive(Debug, Hash)]
pub struct After<T> {
    delay: Duration,
    value: Option<T>,
}

impl<T> After<T> {
    pub fn new(delay: Duration, value: T) -> Self {
        Self {
            delay,
            value: Some(value),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> EventSource for After<T> {
    type Event = T;

    async fn next_event(&mut self) -> Option<T> {
        let value = self.value.take()?;
        time::sleep(self.delay).await;
        Some(value)
    }
}
