//! # Event subscribers.
//!
//! Everything a workflow publishes on its [`Bus`](crate::events::Bus) is fanned
//! out to the registered [`Subscribe`] implementations.
//!
//! ```text
//!   Factory / operator loops / Workflow ── publish(Event) ──► Bus
//!                                                              │
//!                                           Workflow listener ─┘
//!                                                 │
//!                                           SubscriberSet::emit
//!                                     ┌───────────┼────────────┐
//!                                     ▼           ▼            ▼
//!                                 LogWriter    metrics      custom
//! ```
//!
//! - [`Subscribe`] the extension trait
//! - [`SubscriberSet`] bounded per-subscriber queues, panic isolation
//! - [`LogWriter`] renders events through `tracing`

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
