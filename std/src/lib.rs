//! Arbor Std - ready-made [`EventSource`](arbor_core::EventSource)s for
//! timers, one-shot futures, streams and broadcast channels.

pub mod prelude;
pub mod sources;
