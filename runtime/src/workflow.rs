use arbor_core::hints::Hints;
use arbor_core::outcome::Outcome;

use crate::context::RenderContext;

/// A node in the workflow hierarchy.
///
/// A workflow value carries the props its parent supplied on the latest render.
/// The runtime owns the node's `State`: it is created once by
/// [`initial_state`](Workflow::initial_state), read by every
/// [`render`](Workflow::render), and only ever replaced by
/// [`apply`](Workflow::apply) on the host's mutation timeline.
///
/// ```ignore
/// struct Counter;
///
/// impl Workflow for Counter {
///     type State = u32;
///     type Action = ();
///     type Output = Infallible;
///     type Rendering = String;
///
///     fn initial_state(&self, _hints: &Hints) -> u32 { 0 }
///
///     fn render(&self, state: &u32, _ctx: &mut RenderContext<'_, Self>) -> String {
///         format!("count: {state}")
///     }
///
///     fn apply(&self, state: u32, _action: ()) -> Outcome<u32, Infallible> {
///         Outcome::next(state + 1)
///     }
/// }
/// ```
pub trait Workflow: Sized + Send + 'static {
    type State: Send + 'static;
    type Action: Send + 'static;
    type Output: Send + 'static;
    type Rendering;

    /// Called once when a node instance is created at a new tree position.
    fn initial_state(&self, hints: &Hints) -> Self::State;

    /// Pure projection of state into the rendering. Child workflows, sinks and
    /// subscriptions are declared through `ctx`.
    fn render(&self, state: &Self::State, ctx: &mut RenderContext<'_, Self>) -> Self::Rendering;

    /// Transition the state in response to one action, optionally emitting an
    /// output to the parent.
    fn apply(&self, state: Self::State, action: Self::Action)
    -> Outcome<Self::State, Self::Output>;

    /// Called when the parent renders this position again with a new workflow
    /// value. `self` is the new value; `previous` the one it replaces.
    fn on_instance_replaced(&self, _previous: &Self, _state: &mut Self::State) {}
}

/// A child declaration with an optional explicit key and hint overrides.
///
/// ```ignore
/// let row = ctx.render_child_with(
///     Child::new(RowWorkflow { id })
///         .key(id.to_string())
///         .hints(Hints::new().with::<Compact>(true)),
///     Action::Row,
/// );
/// ```
pub struct Child<C> {
    pub(crate) workflow: C,
    pub(crate) key: String,
    pub(crate) hints: Option<Hints>,
}

impl<C: Workflow> Child<C> {
    pub fn new(workflow: C) -> Self {
        Self {
            workflow,
            key: String::new(),
            hints: None,
        }
    }

    /// Distinguish sibling instances of the same workflow type.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Hint values layered over the parent's hints for this subtree.
    pub fn hints(mut self, overrides: Hints) -> Self {
        self.hints = Some(match self.hints.take() {
            Some(existing) => existing.merge(&overrides),
            None => overrides,
        });
        self
    }
}
