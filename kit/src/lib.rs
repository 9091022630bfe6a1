//! Arbor facade crate.
//!
//! This crate re-exports core, runtime, and std crates with a single entry point.

pub use arbor_core as core;
pub use arbor_runtime as runtime;
#[cfg(feature = "std")]
pub use arbor_std as std;

pub use arbor_core::{HintKey, Hints, Outcome, RuntimeConfig, SinkError, hint_key};
pub use arbor_runtime::{Child, RenderContext, Sink, Workflow, WorkflowHost};

pub mod prelude {
    pub use arbor_runtime::prelude::*;
    #[cfg(feature = "std")]
    pub use arbor_std::prelude::*;
}
