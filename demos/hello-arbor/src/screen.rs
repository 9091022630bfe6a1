use std::fmt;

use arbor::prelude::*;

use crate::demo::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
}

impl Color {
    pub fn next(self) -> Self {
        match self {
            Color::Red => Color::Green,
            Color::Green => Color::Blue,
            Color::Blue => Color::Red,
        }
    }
}

/// What the demo shows, plus the taps it accepts.
#[derive(Debug, Clone)]
pub struct DemoScreen {
    pub title: String,
    pub color: Color,
    pub subscribe_title: String,
    pub refresh_text: String,
    pub refresh_enabled: bool,
    pub(crate) sink: Sink<Action>,
}

impl DemoScreen {
    pub fn tap_title(&self) -> Result<(), SinkError> {
        self.sink.send(Action::TitleButtonTapped)
    }

    pub fn tap_subscribe(&self) -> Result<(), SinkError> {
        self.sink.send(Action::SubscribeTapped)
    }

    /// Ignored while a refresh is in flight, like a disabled button.
    pub fn tap_refresh(&self) -> Result<(), SinkError> {
        if !self.refresh_enabled {
            return Ok(());
        }
        self.sink.send(Action::RefreshButtonTapped)
    }
}

impl fmt::Display for DemoScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let refresh = if self.refresh_enabled {
            format!("[{}]", self.refresh_text)
        } else {
            format!("({})", self.refresh_text)
        };
        write!(
            f,
            "{:<5} | {} | <{}> {}",
            format!("{:?}", self.color),
            self.title,
            self.subscribe_title,
            refresh
        )
    }
}
