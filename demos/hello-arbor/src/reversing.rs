use std::convert::Infallible;

use arbor::prelude::*;

/// Renders its text backwards. Stateless.
pub struct ReversingWorkflow {
    pub text: String,
}

impl Workflow for ReversingWorkflow {
    type State = ();
    type Action = Infallible;
    type Output = Infallible;
    type Rendering = String;

    fn initial_state(&self, _hints: &Hints) {}

    fn render(&self, _state: &(), _ctx: &mut RenderContext<'_, Self>) -> String {
        self.text.chars().rev().collect()
    }

    fn apply(&self, _state: (), action: Infallible) -> Outcome<(), Infallible> {
        match action {}
    }
}
