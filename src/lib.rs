//! # opvisor
//!
//! **Opvisor** is a small dataflow operator runtime on top of tokio.
//!
//! Values travel through typed channels; operators consume from input
//! channels, run a user body and emit to output channels. Every operator runs
//! as its own task on the tokio worker pool, processes its messages strictly in
//! order, and reports its lifecycle to listeners and to the owning session. A
//! fatal error in any operator aborts the whole session.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   StreamChannel / FutureChannel                     StreamChannel / FutureChannel
//!            │                                                      ▲
//!            ▼                                                      │
//! ┌────────────────────────────────────────────────────────────────┴──────┐
//! │  Operator (one tokio task per operator)                               │
//! │   read one message per input ─► before hooks ─► body ─► after hooks   │
//! │   stop: on_complete ─► close outputs ─► OperatorTerminated            │
//! └──────┬───────────────────────────────────────────────────┬────────────┘
//!        │ Listener::on_error (unhandled)                     │ publish(Event)
//!        ▼                                                    ▼
//! ┌──────────────────────────────┐        ┌────────────────────────────────┐
//! │ Session::abort (first wins)  │        │ Bus ─► SubscriberSet ─► workers │
//! │  terminate all operators     │        │   LogWriter / custom Subscribe  │
//! └──────────────────────────────┘        └────────────────────────────────┘
//! ```
//!
//! ### Building blocks
//! | Area            | Description                                                   | Key types                                                  |
//! |-----------------|---------------------------------------------------------------|------------------------------------------------------------|
//! | **Channels**    | Unbounded FIFO streams and write-once futures                 | [`StreamChannel`], [`FutureChannel`], [`Channel`]          |
//! | **Operators**   | Message loop, listeners, declarative specs                    | [`OperatorFactory`], [`Operator`], [`Listener`], [`OperatorSpec`] |
//! | **Combinators** | `subscribe`, `chain`, `map`, `reduce`                         | [`Handlers`], [`Fold`]                                     |
//! | **Session**     | Registry, graph hook, abort target                            | [`Session`], [`Registry`], [`GraphRecorder`]               |
//! | **Workflow**    | Ready-made session with events and graceful shutdown          | [`Workflow`], [`WorkflowConfig`]                           |
//! | **Events**      | Lifecycle events fanned out to subscribers                    | [`Event`], [`EventKind`], [`Subscribe`], [`LogWriter`]     |
//! | **Errors**      | Typed errors for configuration, processing and runtime        | [`ConfigError`], [`OperatorError`], [`RuntimeError`]       |
//!
//! ## Example
//! ```rust
//! use opvisor::{Fold, FutureChannel, Handlers, StreamChannel, Workflow, WorkflowConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wf = Workflow::new(WorkflowConfig::default());
//!     let factory = wf.factory();
//!
//!     let words = StreamChannel::of(["alpha", "beta", "gamma"]);
//!     let lengths = factory.map(&words, |w: &'static str| Ok(w.len()))?;
//!
//!     let longest = FutureChannel::new();
//!     factory.reduce(&lengths, &longest, None, |best: &usize, n| {
//!         Ok(if n > *best { Fold::Continue(n) } else { Fold::Skip })
//!     })?;
//!
//!     factory.subscribe(
//!         &longest,
//!         Handlers::new().on_next(|v: Option<usize>| {
//!             println!("longest word: {v:?}");
//!             Ok(())
//!         }),
//!     )?;
//!
//!     wf.run().await?;
//!     assert_eq!(longest.get().await, Some(5));
//!     Ok(())
//! }
//! ```

mod channels;
mod combinators;
mod error;
mod events;
mod operators;
mod session;
mod subscribers;
mod workflow;

// ---- Public re-exports ----

pub use channels::{Channel, ChannelId, FutureChannel, Message, StreamChannel};
pub use combinators::{Fold, Handler, HandlerKey, Handlers};
pub use error::{ChannelError, ConfigError, OperatorError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use operators::{
    BoxListener, Context, DefaultErrorListener, Listener, Operator, OperatorFactory, OperatorId,
    OperatorParams, OperatorSpec, StopReason,
};
pub use session::{BoxError, GraphRecorder, Registry, Session};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use workflow::{Workflow, WorkflowBuilder, WorkflowConfig};
