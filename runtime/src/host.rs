//! # WorkflowHost: the mutation timeline
//!
//! The host owns the workflow tree and the single queue every sink and
//! subscription feeds. It pulls one envelope at a time, applies it (bubbling
//! outputs up to the root in the same step), then re-renders the whole tree
//! before looking at the next envelope.
//!
//! ```ignore
//! let mut host = WorkflowHost::new(RootWorkflow, Hints::new());
//! host.rendering().tap();
//! while let Some(update) = host.next_update().await {
//!     draw(host.rendering());
//!     if let Some(output) = update.output {
//!         break;
//!     }
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use arbor_core::config::RuntimeConfig;
use arbor_core::hints::{Hints, short_type_name};
use arbor_core::snapshot::TreeSnapshot;
use arbor_core::timeline::{Timeline, TimelineEvent, TimelineRecorder};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::Instrument;
use uuid::Uuid;

use crate::sink::Sink;
use crate::tree::{ChildKey, Envelope, Node, NodeId, Shared, Tree};
use crate::workflow::Workflow;

/// What processing one queued envelope did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update<O> {
    /// Whether any node's state transitioned (and a render pass followed).
    pub applied: bool,
    /// Output emitted by the root workflow, if any.
    pub output: Option<O>,
}

/// Runs a root workflow and everything it renders.
pub struct WorkflowHost<W: Workflow> {
    session: Uuid,
    tree: Tree,
    root: NodeId,
    root_live: Arc<AtomicBool>,
    hints: Hints,
    rx: UnboundedReceiver<Envelope>,
    rendering: W::Rendering,
    render_passes: u64,
    recorder: Option<TimelineRecorder>,
}

impl<W: Workflow> WorkflowHost<W> {
    /// Mount `workflow` as the root with default runtime configuration.
    pub fn new(workflow: W, hints: Hints) -> Self {
        Self::with_config(workflow, hints, &RuntimeConfig::default())
    }

    /// Mount `workflow` as the root and perform the first render pass.
    pub fn with_config(workflow: W, hints: Hints, config: &RuntimeConfig) -> Self {
        let session = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = config
            .timeline
            .enabled
            .then(|| TimelineRecorder::new(config.timeline.capacity));

        let mut tree = Tree::new(Shared {
            tx,
            stale_sink: config.stale_sink,
            recorder: recorder.clone(),
        });

        tracing::info!(
            arbor.session = %session,
            arbor.root = short_type_name::<W>(),
            "starting workflow host"
        );

        let mut root = tree.mount::<W>(None, ChildKey::root::<W>(), workflow, hints.clone());
        let root_id = root.id;
        let root_live = Arc::clone(&root.live);
        let rendering = render_pass(&mut tree, &mut *root, session, 1);
        tree.checkin(root);

        Self {
            session,
            tree,
            root: root_id,
            root_live,
            hints,
            rx,
            rendering,
            render_passes: 1,
            recorder,
        }
    }

    /// Latest rendering of the root workflow.
    pub fn rendering(&self) -> &W::Rendering {
        &self.rendering
    }

    pub fn hints(&self) -> &Hints {
        &self.hints
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }

    /// Number of completed render passes, including the initial one.
    pub fn render_passes(&self) -> u64 {
        self.render_passes
    }

    /// Number of mounted node instances.
    pub fn node_count(&self) -> usize {
        self.tree.len()
    }

    /// A sink delivering actions to the root workflow.
    pub fn root_sink(&self) -> Sink<W::Action> {
        Sink::new(
            self.root,
            self.tree.shared.tx.clone(),
            Arc::clone(&self.root_live),
            self.tree.shared.stale_sink,
        )
    }

    /// Wait for the next queued action or event and process it.
    ///
    /// Returns `None` only if the queue is closed, which cannot happen while
    /// the host is alive.
    pub async fn next_update(&mut self) -> Option<Update<W::Output>> {
        let span = tracing::debug_span!("NextUpdate", arbor.session = %self.session);
        let envelope = self.rx.recv().instrument(span).await?;
        Some(self.process(envelope))
    }

    /// Process one queued envelope if any is ready.
    pub fn try_next_update(&mut self) -> Option<Update<W::Output>> {
        let envelope = self.rx.try_recv().ok()?;
        Some(self.process(envelope))
    }

    /// Drain everything already queued, in order.
    pub fn process_pending(&mut self) -> Vec<Update<W::Output>> {
        std::iter::from_fn(|| self.try_next_update()).collect()
    }

    /// Keep processing until the root emits an output.
    pub async fn run_until_output(&mut self) -> Option<W::Output> {
        loop {
            if let Some(output) = self.next_update().await?.output {
                return Some(output);
            }
        }
    }

    /// Replace the root workflow value (new props) and re-render.
    pub fn update_workflow(&mut self, workflow: W) {
        match self.tree.checkout::<W>(self.root) {
            Some(mut root) => {
                root.replace_workflow(workflow);
                self.tree.checkin(root);
                self.rerender();
            }
            None => tracing::error!(arbor.session = %self.session, "root workflow missing"),
        }
    }

    /// Replace the root hints. Re-renders only when they differ.
    pub fn update_hints(&mut self, hints: Hints) -> bool {
        if hints == self.hints {
            return false;
        }
        match self.tree.checkout::<W>(self.root) {
            Some(mut root) => {
                root.hints = hints.clone();
                self.hints = hints;
                self.tree.checkin(root);
                self.rerender();
                true
            }
            None => {
                tracing::error!(arbor.session = %self.session, "root workflow missing");
                false
            }
        }
    }

    /// Structure of the live tree, root first.
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            session: self.session,
            render_passes: self.render_passes,
            nodes: self.tree.snapshot(self.root),
        }
    }

    /// Recorded runtime events, when the timeline is enabled.
    pub fn timeline(&self) -> Option<Timeline> {
        self.recorder.as_ref().map(TimelineRecorder::snapshot)
    }

    /// Tear down the tree, cancelling every subscription.
    pub fn shutdown(self) {}

    fn process(&mut self, envelope: Envelope) -> Update<W::Output> {
        let dispatched = self.tree.dispatch(envelope);
        if !dispatched.applied {
            return Update {
                applied: false,
                output: None,
            };
        }

        let output = dispatched
            .root_output
            .and_then(|output| output.downcast::<W::Output>().ok())
            .map(|output| *output);
        if output.is_some() {
            tracing::info!(arbor.session = %self.session, "root workflow emitted output");
        }

        self.rerender();
        Update {
            applied: true,
            output,
        }
    }

    fn rerender(&mut self) {
        let Some(mut root) = self.tree.checkout::<W>(self.root) else {
            tracing::error!(arbor.session = %self.session, "root workflow missing");
            return;
        };
        self.render_passes += 1;
        self.rendering = render_pass(&mut self.tree, &mut *root, self.session, self.render_passes);
        self.tree.checkin(root);
    }
}

fn render_pass<W: Workflow>(
    tree: &mut Tree,
    root: &mut Node<W>,
    session: Uuid,
    pass: u64,
) -> W::Rendering {
    let span = tracing::info_span!("RenderPass", arbor.session = %session, arbor.pass = pass);
    let _enter = span.enter();

    let rendering = tree.render(root);
    tree.shared
        .record(|timestamp| TimelineEvent::RenderPass { pass, timestamp });
    tracing::trace!(nodes = tree.len(), "render pass complete");
    rendering
}

impl<W: Workflow> Drop for WorkflowHost<W> {
    fn drop(&mut self) {
        tracing::debug!(arbor.session = %self.session, "shutting down workflow host");
        self.tree.unmount(self.root);
    }
}
