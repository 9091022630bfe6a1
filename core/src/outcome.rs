use serde::{Deserialize, Serialize};

/// The explicit result of applying an action to a workflow's state.
///
/// `Outcome` represents "Control Flow as Data".
/// Instead of mutating a parent through a callback, a workflow returns its next
/// state and, optionally, an output that the runtime hands to the parent as one
/// of the parent's own actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome<S, O> {
    /// Move to the next state; nothing is reported upward.
    Next(S),

    /// Move to the next state and report `O` to the parent (or to the host when
    /// the workflow is the root).
    Emit(S, O),
}

impl<S, O> Outcome<S, O> {
    pub fn next(state: S) -> Self {
        Outcome::Next(state)
    }

    pub fn emit(state: S, output: O) -> Self {
        Outcome::Emit(state, output)
    }

    /// Borrow the next state.
    pub fn state(&self) -> &S {
        match self {
            Outcome::Next(s) | Outcome::Emit(s, _) => s,
        }
    }

    /// Borrow the output, if one is being emitted.
    pub fn output(&self) -> Option<&O> {
        match self {
            Outcome::Next(_) => None,
            Outcome::Emit(_, o) => Some(o),
        }
    }

    pub fn is_emit(&self) -> bool {
        matches!(self, Outcome::Emit(_, _))
    }

    /// Split into the next state and the optional output.
    pub fn into_parts(self) -> (S, Option<O>) {
        match self {
            Outcome::Next(s) => (s, None),
            Outcome::Emit(s, o) => (s, Some(o)),
        }
    }

    pub fn map_state<T, F: FnOnce(S) -> T>(self, op: F) -> Outcome<T, O> {
        match self {
            Outcome::Next(s) => Outcome::Next(op(s)),
            Outcome::Emit(s, o) => Outcome::Emit(op(s), o),
        }
    }

    pub fn map_output<P, F: FnOnce(O) -> P>(self, op: F) -> Outcome<S, P> {
        match self {
            Outcome::Next(s) => Outcome::Next(s),
            Outcome::Emit(s, o) => Outcome::Emit(s, op(o)),
        }
    }
}

impl<S, O> From<S> for Outcome<S, O> {
    fn from(state: S) -> Self {
        Outcome::Next(state)
    }
}
