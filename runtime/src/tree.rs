//! Tree - the arena of live node instances.
//!
//! Every mounted workflow is a [`Node`] stored in a flat arena keyed by
//! [`NodeId`]. Parents refer to children by id through their [`ChildSet`], so
//! mounting, unmounting and diffing are explicit operations on the arena rather
//! than effects of call-stack recursion.
//!
//! A node is *checked out* of the arena while it renders or applies an action
//! and checked back in afterwards. That keeps the borrow of a node's state
//! disjoint from the arena its render context mutates.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arbor_core::config::StaleSinkPolicy;
use arbor_core::hints::{Hints, short_type_name};
use arbor_core::snapshot::NodeSnapshot;
use arbor_core::timeline::{TimelineEvent, TimelineRecorder, now_millis};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::context::RenderContext;
use crate::subscription::SubscriptionSet;
use crate::workflow::Workflow;

/// Identity of a live node instance. Never reused within a process.
pub type NodeId = Uuid;

/// Position of a child within its parent: workflow type, explicit key, and
/// the call-order ordinal among siblings sharing both.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct ChildKey {
    workflow: TypeId,
    label: &'static str,
    key: String,
    ordinal: usize,
}

impl ChildKey {
    pub(crate) fn root<W: 'static>() -> Self {
        Self::new::<W>(String::new(), 0)
    }

    pub(crate) fn new<W: 'static>(key: String, ordinal: usize) -> Self {
        Self {
            workflow: TypeId::of::<W>(),
            label: short_type_name::<W>(),
            key,
            ordinal,
        }
    }
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]#{}", self.label, self.key, self.ordinal)
    }
}

impl fmt::Debug for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Work delivered to a node on the mutation timeline.
pub(crate) enum Payload {
    /// An action sent through a [`Sink`](crate::Sink).
    Action(Box<dyn Any + Send>),
    /// A raw event from a running subscription, tagged with its start token.
    Event { token: u64, event: Box<dyn Any + Send> },
    /// A child's output, to be mapped into one of the parent's actions.
    ChildOutput {
        key: ChildKey,
        output: Box<dyn Any + Send>,
    },
}

pub(crate) struct Envelope {
    pub(crate) target: NodeId,
    pub(crate) payload: Payload,
}

/// State shared by everything that feeds the mutation timeline.
#[derive(Clone)]
pub(crate) struct Shared {
    pub(crate) tx: UnboundedSender<Envelope>,
    pub(crate) stale_sink: StaleSinkPolicy,
    pub(crate) recorder: Option<TimelineRecorder>,
}

impl Shared {
    pub(crate) fn record(&self, event: impl FnOnce(i64) -> TimelineEvent) {
        if let Some(recorder) = &self.recorder {
            recorder.record(event(now_millis()));
        }
    }
}

type OutputMap<A> = Box<dyn Fn(Box<dyn Any + Send>) -> Option<A> + Send>;

pub(crate) struct ChildSlot<A> {
    pub(crate) id: NodeId,
    map_output: OutputMap<A>,
}

impl<A: 'static> ChildSlot<A> {
    pub(crate) fn new<C, F>(id: NodeId, map: F) -> Self
    where
        C: Workflow,
        F: Fn(C::Output) -> A + Send + 'static,
    {
        Self {
            id,
            map_output: Box::new(move |output| {
                output
                    .downcast::<C::Output>()
                    .ok()
                    .map(|output| map(*output))
            }),
        }
    }
}

/// Mounted children of one node, in declaration order.
pub(crate) struct ChildSet<A> {
    slots: Vec<(ChildKey, ChildSlot<A>)>,
}

impl<A> Default for ChildSet<A> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<A> ChildSet<A> {
    pub(crate) fn take(&mut self, key: &ChildKey) -> Option<ChildSlot<A>> {
        let position = self.slots.iter().position(|(k, _)| k == key)?;
        Some(self.slots.remove(position).1)
    }

    pub(crate) fn push(&mut self, key: ChildKey, slot: ChildSlot<A>) {
        self.slots.push((key, slot));
    }

    pub(crate) fn map_output(&self, key: &ChildKey, output: Box<dyn Any + Send>) -> Option<A> {
        self.slots
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, slot)| (slot.map_output)(output))
    }

    pub(crate) fn ids(&self) -> Vec<NodeId> {
        self.slots.iter().map(|(_, slot)| slot.id).collect()
    }

    pub(crate) fn clear(&mut self) -> Vec<NodeId> {
        self.slots.drain(..).map(|(_, slot)| slot.id).collect()
    }
}

/// A live workflow instance.
pub(crate) struct Node<W: Workflow> {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) key: ChildKey,
    pub(crate) workflow: W,
    pub(crate) state: W::State,
    pub(crate) hints: Hints,
    pub(crate) children: ChildSet<W::Action>,
    pub(crate) subscriptions: SubscriptionSet<W::Action>,
    pub(crate) live: Arc<AtomicBool>,
}

impl<W: Workflow> Node<W> {
    /// Swap in the workflow value declared by the latest render, letting the
    /// workflow adjust the state it keeps.
    pub(crate) fn replace_workflow(&mut self, workflow: W) {
        let previous = std::mem::replace(&mut self.workflow, workflow);
        self.workflow.on_instance_replaced(&previous, &mut self.state);
    }
}

pub(crate) enum Handled {
    /// Nothing applied: stale subscription token or an unmappable payload.
    Dropped,
    /// Action applied; carries the emitted output, if any.
    Applied(Option<Box<dyn Any + Send>>),
}

/// Object-safe face of [`Node`] stored in the arena.
pub(crate) trait ErasedNode: Send {
    fn parent(&self) -> Option<NodeId>;
    fn key(&self) -> &ChildKey;
    fn label(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn handle(self: Box<Self>, payload: Payload) -> (Box<dyn ErasedNode>, Handled);
    /// Mark the instance dead, cancel its subscriptions and hand back its children.
    fn teardown(&mut self, shared: &Shared) -> Vec<NodeId>;
    fn snapshot(&self) -> NodeSnapshot;
}

impl<W: Workflow> ErasedNode for Node<W> {
    fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    fn key(&self) -> &ChildKey {
        &self.key
    }

    fn label(&self) -> &'static str {
        short_type_name::<W>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn handle(self: Box<Self>, payload: Payload) -> (Box<dyn ErasedNode>, Handled) {
        let mut node = *self;
        let action = match payload {
            Payload::Action(action) => match action.downcast::<W::Action>() {
                Ok(action) => Some(*action),
                Err(_) => {
                    tracing::error!(
                        workflow = short_type_name::<W>(),
                        "action type does not match workflow; dropping"
                    );
                    None
                }
            },
            Payload::Event { token, event } => node.subscriptions.map_event(token, event),
            Payload::ChildOutput { key, output } => node.children.map_output(&key, output),
        };

        let Some(action) = action else {
            return (Box::new(node), Handled::Dropped);
        };

        let (state, output) = node.workflow.apply(node.state, action).into_parts();
        node.state = state;
        let output = output.map(|output| Box::new(output) as Box<dyn Any + Send>);
        (Box::new(node), Handled::Applied(output))
    }

    fn teardown(&mut self, shared: &Shared) -> Vec<NodeId> {
        self.live.store(false, Ordering::Release);
        self.subscriptions.cancel_all(self.id, shared);
        self.children.clear()
    }

    fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            parent: self.parent,
            workflow: short_type_name::<W>().to_string(),
            key: self.key.to_string(),
            children: self.children.ids(),
            subscriptions: self.subscriptions.ids(),
        }
    }
}

/// Result of pushing one envelope through the tree.
pub(crate) struct Dispatched {
    /// At least one node's state transitioned.
    pub(crate) applied: bool,
    /// Output that bubbled past the root.
    pub(crate) root_output: Option<Box<dyn Any + Send>>,
}

pub(crate) struct Tree {
    nodes: HashMap<NodeId, Box<dyn ErasedNode>, ahash::RandomState>,
    pub(crate) shared: Shared,
}

impl Tree {
    pub(crate) fn new(shared: Shared) -> Self {
        Self {
            nodes: HashMap::default(),
            shared,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Create a node instance. The caller renders it and checks it in.
    pub(crate) fn mount<W: Workflow>(
        &self,
        parent: Option<NodeId>,
        key: ChildKey,
        workflow: W,
        hints: Hints,
    ) -> Box<Node<W>> {
        let id = Uuid::new_v4();
        let state = workflow.initial_state(&hints);

        tracing::debug!(node = %id, %key, "mounting workflow node");
        self.shared.record(|timestamp| TimelineEvent::NodeMounted {
            node_id: id,
            workflow: short_type_name::<W>().to_string(),
            key: key.to_string(),
            timestamp,
        });

        Box::new(Node {
            id,
            parent,
            key,
            workflow,
            state,
            hints,
            children: ChildSet::default(),
            subscriptions: SubscriptionSet::default(),
            live: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Remove a node of the expected workflow type from the arena.
    pub(crate) fn checkout<W: Workflow>(&mut self, id: NodeId) -> Option<Box<Node<W>>> {
        let matches = self.nodes.get(&id)?.as_any().is::<Node<W>>();
        if !matches {
            tracing::error!(
                node = %id,
                expected = short_type_name::<W>(),
                "node type changed; remounting"
            );
            self.unmount(id);
            return None;
        }
        self.nodes.remove(&id)?.into_any().downcast::<Node<W>>().ok()
    }

    pub(crate) fn checkin<W: Workflow>(&mut self, node: Box<Node<W>>) {
        self.nodes.insert(node.id, node);
    }

    /// Render a checked-out node: run its render function, then reconcile the
    /// children and subscriptions it declared against what was running before.
    pub(crate) fn render<W: Workflow>(&mut self, node: &mut Node<W>) -> W::Rendering {
        let previous = std::mem::take(&mut node.children);
        let mut ctx = RenderContext::new(&mut *self, node.id, &node.hints, &node.live, previous);
        let rendering = node.workflow.render(&node.state, &mut ctx);
        let declarations = ctx.into_declarations();

        for stale in declarations.stale_children {
            self.unmount(stale);
        }
        node.children = declarations.children;
        node.subscriptions
            .reconcile(node.id, declarations.subscriptions, &self.shared);

        rendering
    }

    /// Destroy a node and, recursively, everything beneath it.
    pub(crate) fn unmount(&mut self, id: NodeId) {
        let Some(mut node) = self.nodes.remove(&id) else {
            return;
        };
        let children = node.teardown(&self.shared);

        tracing::debug!(node = %id, key = %node.key(), "unmounted workflow node");
        self.shared.record(|timestamp| TimelineEvent::NodeUnmounted {
            node_id: id,
            workflow: node.label().to_string(),
            timestamp,
        });

        for child in children {
            self.unmount(child);
        }
    }

    /// Apply one envelope and bubble outputs upward until a node emits nothing
    /// or the root's output leaves the tree. All of it is one transition step:
    /// no render happens between a child's output and its parent's action.
    pub(crate) fn dispatch(&mut self, envelope: Envelope) -> Dispatched {
        let Envelope {
            mut target,
            mut payload,
        } = envelope;
        let mut applied = false;

        loop {
            let Some(node) = self.nodes.remove(&target) else {
                tracing::debug!(node = %target, "dropping action for unmounted workflow node");
                self.shared
                    .record(|timestamp| TimelineEvent::StaleActionDropped {
                        node_id: target,
                        timestamp,
                    });
                return Dispatched {
                    applied,
                    root_output: None,
                };
            };

            let label = node.label();
            let span = tracing::debug_span!("Apply", arbor.node = %target, arbor.workflow = label);
            let _enter = span.enter();

            let (node, handled) = node.handle(payload);
            let parent = node.parent();
            let key = node.key().clone();
            self.nodes.insert(target, node);

            let output = match handled {
                Handled::Dropped => {
                    tracing::trace!("payload no longer maps to an action; dropped");
                    self.shared
                        .record(|timestamp| TimelineEvent::StaleActionDropped {
                            node_id: target,
                            timestamp,
                        });
                    return Dispatched {
                        applied,
                        root_output: None,
                    };
                }
                Handled::Applied(output) => output,
            };

            applied = true;
            self.shared.record(|timestamp| TimelineEvent::ActionApplied {
                node_id: target,
                workflow: label.to_string(),
                timestamp,
            });

            let Some(output) = output else {
                return Dispatched {
                    applied,
                    root_output: None,
                };
            };

            tracing::trace!("workflow emitted output");
            self.shared.record(|timestamp| TimelineEvent::OutputEmitted {
                node_id: target,
                workflow: label.to_string(),
                timestamp,
            });

            match parent {
                Some(parent) => {
                    target = parent;
                    payload = Payload::ChildOutput { key, output };
                }
                None => {
                    return Dispatched {
                        applied,
                        root_output: Some(output),
                    };
                }
            }
        }
    }

    /// Parent-first listing of the subtree rooted at `root`.
    pub(crate) fn snapshot(&self, root: NodeId) -> Vec<NodeSnapshot> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.nodes.get(&id) {
                let snapshot = node.snapshot();
                queue.extend(snapshot.children.iter().copied());
                nodes.push(snapshot);
            }
        }
        nodes
    }
}
