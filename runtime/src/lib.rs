//! Arbor Runtime - renders workflow trees and applies their actions.
//!
//! * [`Workflow`] - the node contract: state, action, output, rendering
//! * [`RenderContext`] - children, sinks and subscriptions declared while rendering
//! * [`Sink`] - thread-safe handle enqueueing actions for one node instance
//! * [`WorkflowHost`] - owns the tree and serializes every state transition

mod context;
mod host;
mod sink;
mod subscription;
mod tree;
mod workflow;

pub use context::RenderContext;
pub use host::{Update, WorkflowHost};
pub use sink::Sink;
pub use tree::NodeId;
pub use workflow::{Child, Workflow};

pub mod prelude {
    pub use crate::context::RenderContext;
    pub use crate::host::{Update, WorkflowHost};
    pub use crate::sink::Sink;
    pub use crate::workflow::{Child, Workflow};
    pub use arbor_core::prelude::*;
}
