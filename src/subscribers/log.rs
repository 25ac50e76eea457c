//! # LogWriter: events rendered through `tracing`
//!
//! A subscriber that turns every [`Event`] into one structured `tracing` record
//! under the `opvisor::events` target. Failures and aborts are logged at `warn`
//! or `error`, lifecycle noise at `debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG opvisor::events: created operator="sum" id=3
//!  WARN opvisor::events: failed operator="sum" id=3 reason="processing failed: overflow"
//! DEBUG opvisor::events: terminated operator="sum" id=3 reason="failed" processed=1
//! ERROR opvisor::events: session-aborted reason="processing failed: overflow"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let operator = e.operator.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::OperatorCreated => {
                debug!(target: "opvisor::events", operator, id = e.operator_id, "created");
            }
            EventKind::OperatorFailed => {
                warn!(target: "opvisor::events", operator, id = e.operator_id, reason, "failed");
            }
            EventKind::OperatorTerminated => {
                debug!(
                    target: "opvisor::events",
                    operator,
                    id = e.operator_id,
                    reason,
                    processed = e.processed,
                    "terminated"
                );
            }
            EventKind::SessionAborted => {
                error!(target: "opvisor::events", reason, "session-aborted");
            }
            EventKind::ShutdownRequested => {
                info!(target: "opvisor::events", "shutdown-requested");
            }
            EventKind::AllStoppedWithin => {
                info!(target: "opvisor::events", "all-stopped-within-grace");
            }
            EventKind::GraceExceeded => {
                warn!(target: "opvisor::events", stuck = reason, "grace-exceeded");
            }
            EventKind::SubscriberPanicked => {
                warn!(target: "opvisor::events", subscriber = operator, reason, "subscriber-panicked");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "opvisor::events", subscriber = operator, reason, "subscriber-overflow");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
