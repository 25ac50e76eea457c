//! Operators: the scheduled execution units of a dataflow graph.
//!
//! An operator consumes from its input channels, invokes its body, emits to its
//! output channels and notifies its listeners at fixed lifecycle points. Each
//! operator runs as its own task on the tokio worker pool; its messages are
//! processed strictly one set at a time, while distinct operators run in parallel.
//!
//! ## Contents
//! - [`Operator`] handle: control (`terminate`) and liveness (`is_terminated`, `join`)
//! - [`Listener`] lifecycle callbacks, [`DefaultErrorListener`] log-and-abort policy
//! - [`OperatorSpec`] / [`OperatorParams`] declarative descriptions
//! - [`Context`] what a body sees (emit, terminate)
//! - [`OperatorFactory`] validation, registration and start-up
//!
//! ## Wiring
//! ```text
//! OperatorFactory::create(spec, body)
//!     ├─► Operator (handle) ──► Registry / GraphRecorder / caller
//!     └─► OperatorLoop ──► tokio::spawn
//!             Channel<T> ──► body(ctx, msgs) ──► ctx.emit ──► Channel<U>
//!                               │
//!                               └─► Listener hooks ──► on_error ──► Session::abort
//! ```

mod context;
mod factory;
mod listener;
mod operator;
mod runner;
mod spec;

pub use context::Context;
pub use factory::OperatorFactory;
pub use listener::{BoxListener, DefaultErrorListener, Listener};
pub use operator::{Operator, OperatorId, StopReason};
pub use spec::{OperatorParams, OperatorSpec};

pub(crate) use listener::escalate;
