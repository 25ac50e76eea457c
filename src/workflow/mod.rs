//! Workflow: the bundled [`Session`](crate::Session) implementation.
//!
//! - [`WorkflowConfig`] grace period and bus capacity
//! - [`WorkflowBuilder`] subscribers and graph recorder
//! - [`Workflow`] registry, event bus, idempotent abort, run and graceful shutdown

mod builder;
mod config;
mod shutdown;
#[allow(clippy::module_inception)]
mod workflow;

pub use builder::WorkflowBuilder;
pub use config::WorkflowConfig;
pub use workflow::Workflow;
