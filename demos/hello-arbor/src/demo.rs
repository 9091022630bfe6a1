use std::convert::Infallible;
use std::time::Duration;

use arbor::prelude::*;

use crate::refresher::{RefreshError, Refresher};
use crate::reversing::ReversingWorkflow;
use crate::screen::{Color, DemoScreen};

pub const TIMER_PERIOD: Duration = Duration::from_secs(1);
pub const REFRESH_DELAY: Duration = Duration::from_secs(1);

hint_key! {
    /// Appended to the greeting.
    pub Punctuation: String = "!".to_string();
}

/// Greets `name`, cycling colours and refreshing a status line.
#[derive(Debug, Clone)]
pub struct DemoWorkflow {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadingState {
    Idle { title: String },
    Loading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Not,
    Subscribing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoState {
    pub color: Color,
    pub loading: LoadingState,
    pub subscription: SubscriptionState,
}

#[derive(Debug)]
pub enum Action {
    TitleButtonTapped,
    SubscribeTapped,
    RefreshButtonTapped,
    RefreshComplete(String),
    RefreshFailed(RefreshError),
}

impl Workflow for DemoWorkflow {
    type State = DemoState;
    type Action = Action;
    type Output = Infallible;
    type Rendering = DemoScreen;

    fn initial_state(&self, _hints: &Hints) -> DemoState {
        DemoState {
            color: Color::Red,
            loading: LoadingState::Idle {
                title: "Not Loaded".to_string(),
            },
            subscription: SubscriptionState::Not,
        }
    }

    fn render(&self, state: &DemoState, ctx: &mut RenderContext<'_, Self>) -> DemoScreen {
        let sink = ctx.make_sink();
        let mut title = format!("Hello, {}{}", self.name, ctx.hints().get::<Punctuation>());

        let (refresh_text, refresh_enabled) = match &state.loading {
            LoadingState::Idle { title: refresh_title } => {
                title = ctx.render_child(ReversingWorkflow { text: title }, |o| match o {});
                (refresh_title.clone(), true)
            }
            LoadingState::Loading => {
                ctx.subscribe(Refresher::new(REFRESH_DELAY), |result| match result {
                    Ok(message) => Action::RefreshComplete(message),
                    Err(error) => Action::RefreshFailed(error),
                });
                ("Loading...".to_string(), false)
            }
        };

        let subscribe_title = match state.subscription {
            SubscriptionState::Not => "Subscribe",
            SubscriptionState::Subscribing => {
                ctx.subscribe(Every::new(TIMER_PERIOD), |_| Action::TitleButtonTapped);
                "Stop"
            }
        };

        DemoScreen {
            title,
            color: state.color,
            subscribe_title: subscribe_title.to_string(),
            refresh_text,
            refresh_enabled,
            sink,
        }
    }

    fn apply(&self, mut state: DemoState, action: Action) -> Outcome<DemoState, Infallible> {
        tracing::debug!(?action, "demo action");
        match action {
            Action::TitleButtonTapped => state.color = state.color.next(),
            Action::SubscribeTapped => {
                state.subscription = match state.subscription {
                    SubscriptionState::Not => SubscriptionState::Subscribing,
                    SubscriptionState::Subscribing => SubscriptionState::Not,
                }
            }
            Action::RefreshButtonTapped => state.loading = LoadingState::Loading,
            Action::RefreshComplete(title) => state.loading = LoadingState::Idle { title },
            Action::RefreshFailed(error) => {
                state.loading = LoadingState::Idle {
                    title: error.to_string(),
                }
            }
        }
        Outcome::next(state)
    }
}
