use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arbor_core::config::StaleSinkPolicy;
use arbor_core::error::SinkError;
use tokio::sync::mpsc::UnboundedSender;

use crate::tree::{Envelope, NodeId, Payload};

/// Handle for delivering actions to one node instance.
///
/// Sinks are cheap to clone and may be sent to any thread. Each `send` enqueues
/// the action on the host's mutation timeline; it is applied after the actions
/// queued before it, and a full render pass runs before the next one.
///
/// Once the node is unmounted the sink is stale: sends fail with
/// [`SinkError::Stale`], or are silently discarded under
/// [`StaleSinkPolicy::Ignore`].
pub struct Sink<A> {
    node: NodeId,
    tx: UnboundedSender<Envelope>,
    live: Arc<AtomicBool>,
    policy: StaleSinkPolicy,
    _action: PhantomData<fn(A)>,
}

impl<A: Send + 'static> Sink<A> {
    pub(crate) fn new(
        node: NodeId,
        tx: UnboundedSender<Envelope>,
        live: Arc<AtomicBool>,
        policy: StaleSinkPolicy,
    ) -> Self {
        Self {
            node,
            tx,
            live,
            policy,
            _action: PhantomData,
        }
    }

    pub fn send(&self, action: A) -> Result<(), SinkError> {
        if !self.is_live() {
            return match self.policy {
                StaleSinkPolicy::Error => Err(SinkError::Stale { node: self.node }),
                StaleSinkPolicy::Ignore => {
                    tracing::debug!(node = %self.node, "discarding action sent to unmounted node");
                    Ok(())
                }
            };
        }

        let envelope = Envelope {
            target: self.node,
            payload: Payload::Action(Box::new(action) as Box<dyn Any + Send>),
        };
        self.tx.send(envelope).map_err(|_| SinkError::Closed)
    }

    /// Whether the target node instance is still mounted.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }
}

impl<A> Clone for Sink<A> {
    fn clone(&self) -> Self {
        Self {
            node: self.node,
            tx: self.tx.clone(),
            live: Arc::clone(&self.live),
            policy: self.policy,
            _action: PhantomData,
        }
    }
}

impl<A> fmt::Debug for Sink<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("node", &self.node)
            .field("live", &self.live.load(Ordering::Acquire))
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn sink(
        policy: StaleSinkPolicy,
    ) -> (Sink<u32>, Arc<AtomicBool>, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let live = Arc::new(AtomicBool::new(true));
        (Sink::new(Uuid::new_v4(), tx, Arc::clone(&live), policy), live, rx)
    }

    #[test]
    fn test_send_enqueues_for_target() {
        let (sink, _live, mut rx) = sink(StaleSinkPolicy::Error);
        sink.send(7).unwrap();

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.target, sink.node_id());
        match envelope.payload {
            Payload::Action(action) => assert_eq!(*action.downcast::<u32>().unwrap(), 7),
            _ => panic!("expected an action payload"),
        }
    }

    #[test]
    fn test_stale_sink_errors_by_default() {
        let (sink, live, mut rx) = sink(StaleSinkPolicy::Error);
        live.store(false, Ordering::Release);

        assert_eq!(sink.send(1), Err(SinkError::Stale { node: sink.node_id() }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stale_sink_ignored_when_configured() {
        let (sink, live, mut rx) = sink(StaleSinkPolicy::Ignore);
        live.store(false, Ordering::Release);

        assert_eq!(sink.send(1), Ok(()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_host_reported() {
        let (sink, _live, rx) = sink(StaleSinkPolicy::Error);
        drop(rx);

        assert_eq!(sink.send(1), Err(SinkError::Closed));
    }

    #[test]
    fn test_clones_share_liveness() {
        let (sink, live, _rx) = sink(StaleSinkPolicy::Error);
        let clone = sink.clone();
        live.store(false, Ordering::Release);

        assert!(!clone.is_live());
        assert!(format!("{clone:?}").contains("live: false"));
    }
}
