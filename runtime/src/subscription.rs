//! Subscription Manager - per-node reconciliation of long-running event sources.
//!
//! Every render pass a node declares the full set of sources it wants. The
//! [`SubscriptionSet`] diffs that against what is running:
//!
//! - declared and running: keep the task, swap in the latest event mapping
//! - declared, not running: spawn a task pulling from the source
//! - running, not declared: abort the task
//!
//! Events travel to the host tagged with the token of the task that produced
//! them. Cancelling a subscription retires its token, so events already queued
//! from a cancelled task are dropped instead of applied.

use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use arbor_core::event::{EventSource, SourceIdentity};
use arbor_core::timeline::TimelineEvent;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::tree::{Envelope, NodeId, Payload, Shared};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identity of a subscription within its node: the source's configuration
/// identity plus its ordinal among identical declarations in one render.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SubscriptionId {
    source: SourceIdentity,
    ordinal: usize,
}

impl SubscriptionId {
    pub(crate) fn new(source: SourceIdentity, ordinal: usize) -> Self {
        Self { source, ordinal }
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.ordinal)
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

type EventMap<A> = Box<dyn Fn(Box<dyn Any + Send>) -> Option<A> + Send>;
type Starter = Box<dyn FnOnce(Emitter) -> Option<JoinHandle<()>> + Send>;

/// A subscription declared during one render pass.
pub(crate) struct Declared<A> {
    id: SubscriptionId,
    start: Starter,
    map: EventMap<A>,
}

impl<A: 'static> Declared<A> {
    pub(crate) fn new<S, F>(source: S, ordinal: usize, map: F) -> Self
    where
        S: EventSource + Hash,
        F: Fn(S::Event) -> A + Send + 'static,
    {
        let id = SubscriptionId::new(SourceIdentity::of(&source), ordinal);
        Self {
            id,
            start: Box::new(move |emitter| emitter.spawn(source)),
            map: Box::new(move |event| event.downcast::<S::Event>().ok().map(|event| map(*event))),
        }
    }
}

/// Sending half handed to a subscription task.
pub(crate) struct Emitter {
    tx: UnboundedSender<Envelope>,
    target: NodeId,
    token: u64,
}

impl Emitter {
    fn spawn<S: EventSource>(self, mut source: S) -> Option<JoinHandle<()>> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::error!(
                    node = %self.target,
                    "no tokio runtime on this thread; subscription will not start"
                );
                return None;
            }
        };

        Some(handle.spawn(async move {
            while let Some(event) = source.next_event().await {
                let envelope = Envelope {
                    target: self.target,
                    payload: Payload::Event {
                        token: self.token,
                        event: Box::new(event),
                    },
                };
                if self.tx.send(envelope).is_err() {
                    break;
                }
            }
            tracing::trace!(node = %self.target, token = self.token, "event source finished");
        }))
    }
}

struct Running<A> {
    id: SubscriptionId,
    token: u64,
    task: Option<JoinHandle<()>>,
    map: EventMap<A>,
}

impl<A> Drop for Running<A> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// The subscriptions currently running for one node.
pub(crate) struct SubscriptionSet<A> {
    running: Vec<Running<A>>,
}

impl<A> Default for SubscriptionSet<A> {
    fn default() -> Self {
        Self {
            running: Vec::new(),
        }
    }
}

impl<A> SubscriptionSet<A> {
    pub(crate) fn reconcile(&mut self, node: NodeId, declared: Vec<Declared<A>>, shared: &Shared) {
        let mut next = Vec::with_capacity(declared.len());

        for declaration in declared {
            let existing = self.running.iter().position(|r| r.id == declaration.id);
            match existing {
                Some(position) => {
                    let mut running = self.running.swap_remove(position);
                    running.map = declaration.map;
                    next.push(running);
                }
                None => {
                    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
                    let emitter = Emitter {
                        tx: shared.tx.clone(),
                        target: node,
                        token,
                    };
                    let task = (declaration.start)(emitter);

                    tracing::debug!(
                        node = %node,
                        subscription = %declaration.id,
                        "subscription started"
                    );
                    shared.record(|timestamp| TimelineEvent::SubscriptionStarted {
                        node_id: node,
                        subscription: declaration.id.to_string(),
                        timestamp,
                    });

                    next.push(Running {
                        id: declaration.id,
                        token,
                        task,
                        map: declaration.map,
                    });
                }
            }
        }

        let stale = std::mem::replace(&mut self.running, next);
        Self::cancel(node, stale, shared);
    }

    /// Stop everything, e.g. when the node is unmounted.
    pub(crate) fn cancel_all(&mut self, node: NodeId, shared: &Shared) {
        let stale = std::mem::take(&mut self.running);
        Self::cancel(node, stale, shared);
    }

    fn cancel(node: NodeId, stale: Vec<Running<A>>, shared: &Shared) {
        for running in stale {
            tracing::debug!(node = %node, subscription = %running.id, "subscription cancelled");
            shared.record(|timestamp| TimelineEvent::SubscriptionCancelled {
                node_id: node,
                subscription: running.id.to_string(),
                timestamp,
            });
        }
    }

    /// Map an event into an action if its token still belongs to a running
    /// subscription.
    pub(crate) fn map_event(&self, token: u64, event: Box<dyn Any + Send>) -> Option<A> {
        self.running
            .iter()
            .find(|r| r.token == token)
            .and_then(|r| (r.map)(event))
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.running.iter().map(|r| r.id.to_string()).collect()
    }
}
