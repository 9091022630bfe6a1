use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use arbor_core::event::{EventSource, SourceIdentity};
use arbor_core::hints::Hints;

use crate::sink::Sink;
use crate::subscription::Declared;
use crate::tree::{ChildKey, ChildSet, ChildSlot, NodeId, Tree};
use crate::workflow::{Child, Workflow};

/// Scope handed to [`Workflow::render`] for one node during one render pass.
///
/// Through it a workflow reads its hints, creates sinks, renders children
/// and declares the subscriptions it wants running. Whatever was declared
/// last time but not this time is torn down when the pass over this node ends.
pub struct RenderContext<'a, W: Workflow> {
    tree: &'a mut Tree,
    node: NodeId,
    hints: &'a Hints,
    live: &'a Arc<AtomicBool>,
    previous: ChildSet<W::Action>,
    children: ChildSet<W::Action>,
    subscriptions: Vec<Declared<W::Action>>,
    child_ordinals: HashMap<ChildKey, usize, ahash::RandomState>,
    source_ordinals: HashMap<SourceIdentity, usize, ahash::RandomState>,
}

pub(crate) struct Declarations<A> {
    pub(crate) stale_children: Vec<NodeId>,
    pub(crate) children: ChildSet<A>,
    pub(crate) subscriptions: Vec<Declared<A>>,
}

impl<'a, W: Workflow> RenderContext<'a, W> {
    pub(crate) fn new(
        tree: &'a mut Tree,
        node: NodeId,
        hints: &'a Hints,
        live: &'a Arc<AtomicBool>,
        previous: ChildSet<W::Action>,
    ) -> Self {
        Self {
            tree,
            node,
            hints,
            live,
            previous,
            children: ChildSet::default(),
            subscriptions: Vec::new(),
            child_ordinals: HashMap::default(),
            source_ordinals: HashMap::default(),
        }
    }

    /// Hints in effect for this node.
    pub fn hints(&self) -> &Hints {
        self.hints
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// A sink delivering actions to this node instance.
    pub fn make_sink(&self) -> Sink<W::Action> {
        let shared = &self.tree.shared;
        Sink::new(
            self.node,
            shared.tx.clone(),
            Arc::clone(self.live),
            shared.stale_sink,
        )
    }

    /// Keep `source` running while this node keeps declaring it, mapping each
    /// of its events into an action.
    ///
    /// Sources with equal type and `Hash` output are the same subscription; a
    /// changed configuration cancels the old one and starts the new one.
    pub fn subscribe<S, F>(&mut self, source: S, map: F)
    where
        S: EventSource + Hash,
        F: Fn(S::Event) -> W::Action + Send + 'static,
    {
        let ordinal = self
            .source_ordinals
            .entry(SourceIdentity::of(&source))
            .or_insert(0);
        let declared = Declared::new(source, *ordinal, map);
        *ordinal += 1;
        self.subscriptions.push(declared);
    }

    /// Render `child` at the next unkeyed position for its type.
    pub fn render_child<C, F>(&mut self, child: C, map: F) -> C::Rendering
    where
        C: Workflow,
        F: Fn(C::Output) -> W::Action + Send + 'static,
    {
        self.render_child_with(Child::new(child), map)
    }

    /// Render `child` at the position named by `key`.
    pub fn render_child_keyed<C, F>(
        &mut self,
        child: C,
        key: impl Into<String>,
        map: F,
    ) -> C::Rendering
    where
        C: Workflow,
        F: Fn(C::Output) -> W::Action + Send + 'static,
    {
        self.render_child_with(Child::new(child).key(key), map)
    }

    /// Render a child declaration and return its rendering.
    ///
    /// The child keeps its state across passes as long as the same type and
    /// key is rendered again; otherwise a fresh instance is mounted. Outputs
    /// the child emits are turned into this node's actions with `map`.
    pub fn render_child_with<C, F>(&mut self, child: Child<C>, map: F) -> C::Rendering
    where
        C: Workflow,
        F: Fn(C::Output) -> W::Action + Send + 'static,
    {
        let Child {
            workflow,
            key,
            hints: overrides,
        } = child;

        let base = ChildKey::new::<C>(key.clone(), 0);
        let ordinal = self.child_ordinals.entry(base).or_insert(0);
        let child_key = ChildKey::new::<C>(key, *ordinal);
        *ordinal += 1;

        let hints = match overrides {
            Some(overrides) => self.hints.merge(&overrides),
            None => self.hints.clone(),
        };

        let existing = self
            .previous
            .take(&child_key)
            .and_then(|slot| self.tree.checkout::<C>(slot.id));

        let mut node = match existing {
            Some(mut node) => {
                node.replace_workflow(workflow);
                node.hints = hints;
                node
            }
            None => self
                .tree
                .mount::<C>(Some(self.node), child_key.clone(), workflow, hints),
        };

        let rendering = self.tree.render(&mut *node);
        let id = node.id;
        self.tree.checkin(node);
        self.children.push(child_key, ChildSlot::new::<C, F>(id, map));

        rendering
    }

    pub(crate) fn into_declarations(self) -> Declarations<W::Action> {
        let mut previous = self.previous;
        Declarations {
            stale_children: previous.clear(),
            children: self.children,
            subscriptions: self.subscriptions,
        }
    }
}
