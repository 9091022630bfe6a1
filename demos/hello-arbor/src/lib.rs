pub mod demo;
pub mod refresher;
pub mod reversing;
pub mod screen;

pub use demo::{Action, DemoState, DemoWorkflow, Punctuation};
pub use screen::{Color, DemoScreen};
