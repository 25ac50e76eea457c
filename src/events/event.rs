//! # Runtime events emitted by the factory, operators and the workflow.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Operator events**: creation, failure and termination of one operator
//! - **Session events**: abort and graceful shutdown of the whole workflow
//! - **Subscriber events**: delivery problems inside the fan-out itself
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! operator name/id, reasons and processed-message counts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use opvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::OperatorFailed)
//!     .with_operator("sum")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::OperatorFailed);
//! assert_eq!(ev.operator.as_deref(), Some("sum"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::operators::{Operator, StopReason};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Operator events ===
    /// Operator was built, registered and is about to start.
    ///
    /// Sets:
    /// - `operator`, `operator_id`
    OperatorCreated,

    /// Operator raised a processing error (before listeners decide on it).
    ///
    /// Sets:
    /// - `operator`, `operator_id`
    /// - `reason`: error message
    OperatorFailed,

    /// Operator stopped for good.
    ///
    /// Sets:
    /// - `operator`, `operator_id`
    /// - `reason`: `exhausted`, `terminated` or `failed`
    /// - `processed`: number of messages fully processed
    OperatorTerminated,

    // === Session events ===
    /// Session abort was triggered (published once per session).
    ///
    /// Sets:
    /// - `reason`: abort cause
    SessionAborted,

    /// Graceful shutdown requested (OS signal or explicit call).
    ShutdownRequested,

    /// All operators stopped within configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some operators did not stop in time.
    GraceExceeded,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `operator`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `operator`: subscriber name
    /// - `reason`: `full` or `closed`
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Operator (or subscriber) name, if applicable.
    pub operator: Option<Arc<str>>,
    /// Operator id, if applicable.
    pub operator_id: Option<u64>,
    /// Human-readable reason (errors, stop reasons, overflow details).
    pub reason: Option<Arc<str>>,
    /// Messages processed by the operator at the time of the event.
    pub processed: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            operator: None,
            operator_id: None,
            reason: None,
            processed: None,
        }
    }

    /// Attaches an operator (or subscriber) name.
    #[inline]
    pub fn with_operator(mut self, name: impl Into<Arc<str>>) -> Self {
        self.operator = Some(name.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a processed-message count.
    #[inline]
    pub fn with_processed(mut self, n: u64) -> Self {
        self.processed = Some(n);
        self
    }

    /// Event describing `op`: name and id are filled in.
    pub(crate) fn for_operator(kind: EventKind, op: &Operator) -> Self {
        let mut ev = Event::new(kind).with_operator(op.name());
        ev.operator_id = Some(op.id().get());
        ev
    }

    /// Creates an `OperatorTerminated` event.
    pub(crate) fn operator_terminated(op: &Operator, reason: StopReason) -> Self {
        Event::for_operator(EventKind::OperatorTerminated, op)
            .with_reason(reason.as_str())
            .with_processed(op.processed())
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_operator(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_operator(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::ShutdownRequested);
        let b = Event::new(EventKind::ShutdownRequested);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn overflow_carries_subscriber_and_reason() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert_eq!(ev.operator.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("full"));
    }
}
