//! # Operator message loop.
//!
//! One [`OperatorLoop`] drives one operator on the tokio worker pool.
//!
//! ## Flow
//! ```text
//! loop {
//!   ├─► stop requested?                      ─► Terminated
//!   ├─► read one message per input (cancellable by terminate())
//!   │       └─ any input exhausted            ─► Exhausted
//!   ├─► step():
//!   │     before_message (all listeners)
//!   │     body(ctx, messages)
//!   │     after_message (all listeners)
//!   │       └─ Err / panic ─► fail(): on_error chain, escalate if unhandled ─► Failed
//!   ├─► processed += 1
//!   └─► only future inputs?                   ─► Exhausted (their single value is consumed)
//! }
//! finish(reason):
//!   latch terminated ─► on_complete (once) ─► close output streams
//!   ─► publish OperatorTerminated ─► release join()
//! ```
//!
//! ## Rules
//! - One message set is fully processed (body + after hooks) before the next read.
//! - Stop requests are honoured only at safe points: before a read, or while waiting for one.
//! - Panics in the body or hooks never unwind out of the loop; they become
//!   [`OperatorError::Panicked`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use super::listener::{escalate, BoxListener};
use super::{Context, Operator, StopReason};
use crate::channels::{Channel, Message};
use crate::error::OperatorError;
use crate::events::{Event, EventKind};
use crate::session::Session;

/// Type-erased operator body.
pub(crate) type BoxBody<T, U> =
    Box<dyn FnMut(&Context<U>, Vec<T>) -> Result<(), OperatorError> + Send>;

/// Owns everything one operator needs while it runs.
pub(crate) struct OperatorLoop<T: Message, U: Message> {
    pub(crate) operator: Operator,
    pub(crate) inputs: Vec<Channel<T>>,
    pub(crate) listeners: Vec<BoxListener<T>>,
    pub(crate) body: BoxBody<T, U>,
    pub(crate) ctx: Context<U>,
    pub(crate) session: Option<Arc<dyn Session>>,
}

impl<T: Message, U: Message> OperatorLoop<T, U> {
    /// Runs until the inputs are exhausted, `terminate()` is called, or an error occurs.
    pub(crate) async fn run(mut self) {
        let stop = self.operator.stop_token().clone();
        // Future inputs return their value on every read: one step consumes them.
        let single_shot = self.inputs.iter().all(Channel::is_future);

        let reason = loop {
            if self.operator.stop_requested() {
                break StopReason::Terminated;
            }
            let batch = tokio::select! {
                biased;
                _ = stop.cancelled() => break StopReason::Terminated,
                batch = read_batch(&self.inputs) => batch,
            };
            let Some(messages) = batch else {
                break StopReason::Exhausted;
            };
            if let Err(err) = self.step(messages) {
                self.fail(&err);
                break StopReason::Failed;
            }
            self.operator.record_processed();
            if single_shot && !self.operator.stop_requested() {
                break StopReason::Exhausted;
            }
        };

        self.finish(reason);
    }

    /// Processes one message set: before hooks, body, after hooks.
    fn step(&mut self, messages: Vec<T>) -> Result<(), OperatorError> {
        let operator = self.operator.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<(), OperatorError> {
            for listener in self.listeners.iter_mut() {
                listener.before_message(&operator, &messages)?;
            }
            let observed = if self.listeners.is_empty() {
                Vec::new()
            } else {
                messages.clone()
            };
            (self.body)(&self.ctx, messages)?;
            for listener in self.listeners.iter_mut() {
                listener.after_message(&operator, &observed)?;
            }
            Ok(())
        }));
        outcome.unwrap_or_else(|payload| Err(OperatorError::from_panic(payload)))
    }

    /// Runs the on_error chain; escalates when no listener handled the error.
    fn fail(&mut self, err: &OperatorError) {
        let operator = self.operator.clone();
        debug!(operator = operator.name(), label = err.as_label(), "operator error");
        self.publish(
            Event::for_operator(EventKind::OperatorFailed, &operator).with_reason(err.to_string()),
        );

        let handled = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut handled = false;
            for listener in self.listeners.iter_mut() {
                handled |= listener.on_error(&operator, err);
            }
            handled
        }))
        .unwrap_or_else(|payload| {
            warn!(
                operator = operator.name(),
                "error listener panicked: {}",
                crate::error::panic_message(payload.as_ref())
            );
            false
        });

        if !handled {
            escalate(self.session.as_deref(), &operator, err);
        }
    }

    /// Latches termination and runs the completion sequence exactly once.
    fn finish(mut self, reason: StopReason) {
        let operator = self.operator.clone();
        if !operator.mark_terminated(reason) {
            return;
        }
        debug!(
            operator = operator.name(),
            reason = reason.as_str(),
            processed = operator.processed(),
            "operator stopped"
        );

        let mut errors = Vec::new();
        for listener in self.listeners.iter_mut() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_complete(&operator))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(err),
                Err(payload) => errors.push(OperatorError::from_panic(payload)),
            }
        }
        for err in errors {
            self.fail(&err);
        }

        self.ctx.close_outputs();
        self.publish(Event::operator_terminated(&operator, reason));
        operator.mark_done();
    }

    fn publish(&self, event: Event) {
        if let Some(session) = &self.session {
            session.publish(event);
        }
    }
}

impl<T: Message, U: Message> Drop for OperatorLoop<T, U> {
    fn drop(&mut self) {
        // The task may be dropped mid-read when its runtime shuts down.
        self.operator.mark_terminated(StopReason::Terminated);
        self.operator.mark_done();
    }
}

/// Reads one message from every input, in order. `None` once any input is exhausted.
async fn read_batch<T: Message>(inputs: &[Channel<T>]) -> Option<Vec<T>> {
    let mut batch = Vec::with_capacity(inputs.len());
    for ch in inputs {
        batch.push(ch.read().await?);
    }
    Some(batch)
}
