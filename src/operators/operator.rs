//! # Operator handle and liveness latch.
//!
//! [`Operator`] is the cloneable handle returned by the factory, stored in the
//! registry and passed to bodies and listeners. It never owns the message loop;
//! it only exposes the loop's control and state:
//!
//! ```text
//!   terminate() ──► stop token ──► loop exits at the next safe point
//!                                      │
//!                                      ├─► terminated latch (set once)
//!                                      ├─► on_complete hooks
//!                                      └─► done token ──► join() returns
//! ```
//!
//! ## Rules
//! - `terminate()` is a request: idempotent, callable from any thread, including
//!   from inside the operator's own body or listeners.
//! - `is_terminated()` flips to `true` exactly once, when the loop stops, and never back.
//! - `join()` returns after the completion hooks have run.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::channels::ChannelId;

/// Global counter for operator ids.
static OPERATOR_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique operator identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorId(u64);

impl OperatorId {
    fn next() -> Self {
        Self(OPERATOR_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Why an operator stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An input delivered its end-of-stream token.
    Exhausted,
    /// `terminate()` was called.
    Terminated,
    /// A processing error stopped the operator.
    Failed,
}

impl StopReason {
    /// Stable snake_case label.
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Exhausted => "exhausted",
            StopReason::Terminated => "terminated",
            StopReason::Failed => "failed",
        }
    }
}

struct OperatorInner {
    id: OperatorId,
    name: Arc<str>,
    inputs: Vec<ChannelId>,
    outputs: Vec<ChannelId>,
    stop: CancellationToken,
    done: CancellationToken,
    terminated: AtomicBool,
    reason: OnceLock<StopReason>,
    processed: AtomicU64,
}

/// Handle to a scheduled operator.
#[derive(Clone)]
pub struct Operator {
    inner: Arc<OperatorInner>,
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

impl Operator {
    pub(crate) fn new(name: Option<String>, inputs: Vec<ChannelId>, outputs: Vec<ChannelId>) -> Self {
        let id = OperatorId::next();
        let name: Arc<str> = match name {
            Some(n) => n.into(),
            None => format!("operator-{}", id.get()).into(),
        };
        Self {
            inner: Arc::new(OperatorInner {
                id,
                name,
                inputs,
                outputs,
                stop: CancellationToken::new(),
                done: CancellationToken::new(),
                terminated: AtomicBool::new(false),
                reason: OnceLock::new(),
                processed: AtomicU64::new(0),
            }),
        }
    }

    /// Operator identifier.
    pub fn id(&self) -> OperatorId {
        self.inner.id
    }

    /// Operator name (explicit, or `operator-<id>`).
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Ids of the input channels, in read order.
    pub fn inputs(&self) -> &[ChannelId] {
        &self.inner.inputs
    }

    /// Ids of the output channels.
    pub fn outputs(&self) -> &[ChannelId] {
        &self.inner.outputs
    }

    /// Requests the operator to stop before reading its next message.
    pub fn terminate(&self) {
        self.inner.stop.cancel();
    }

    /// True once the message loop has stopped.
    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::Acquire)
    }

    /// Negation of [`is_terminated`](Self::is_terminated).
    pub fn is_alive(&self) -> bool {
        !self.is_terminated()
    }

    /// Why the operator stopped, once it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.inner.reason.get().copied()
    }

    /// Number of messages fully processed (body and after-message hooks).
    pub fn processed(&self) -> u64 {
        self.inner.processed.load(Ordering::Acquire)
    }

    /// Waits until the operator has stopped and its completion hooks have run.
    pub async fn join(&self) {
        self.inner.done.cancelled().await;
    }

    pub(crate) fn stop_token(&self) -> &CancellationToken {
        &self.inner.stop
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.inner.stop.is_cancelled()
    }

    pub(crate) fn record_processed(&self) {
        self.inner.processed.fetch_add(1, Ordering::AcqRel);
    }

    /// Latches the terminated flag. Returns `false` if it was already set.
    pub(crate) fn mark_terminated(&self, reason: StopReason) -> bool {
        if self.inner.terminated.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _ = self.inner.reason.set(reason);
        true
    }

    pub(crate) fn mark_done(&self) {
        self.inner.done.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_uses_id() {
        let op = Operator::new(None, vec![], vec![]);
        assert_eq!(op.name(), format!("operator-{}", op.id().get()));
    }

    #[test]
    fn terminated_latch_is_set_once() {
        let op = Operator::new(Some("latch".into()), vec![], vec![]);
        assert!(op.is_alive());
        assert!(op.mark_terminated(StopReason::Terminated));
        assert!(!op.mark_terminated(StopReason::Failed));
        assert!(op.is_terminated());
        assert_eq!(op.stop_reason(), Some(StopReason::Terminated));
    }

    #[test]
    fn terminate_only_requests_stop() {
        let op = Operator::new(None, vec![], vec![]);
        op.terminate();
        op.terminate();
        assert!(op.stop_requested());
        assert!(!op.is_terminated());
    }
}
