//! # Operator lifecycle listeners.
//!
//! A [`Listener`] observes one operator without controlling its body. The loop
//! calls every listener, in registration order, at four points:
//!
//! ```text
//! read messages ─► before_message ─► body ─► after_message ─► (next message)
//!                        │             │           │
//!                        └─────────────┴───────────┴─► Err ─► on_error (all listeners)
//!                                                                  │
//!                                        none handled ─► escalate: log + Session::abort
//! stop ─► on_complete (exactly once)
//! ```
//!
//! ## Rules
//! - Hooks take `&mut self`: a listener is owned by its operator's loop and is
//!   never called concurrently, so it can keep plain mutable state.
//! - `on_error` returns "handled". The operator stops after any error either way;
//!   "unhandled" additionally escalates to a session abort.
//! - An error returned from `on_complete` goes down the same error path.

use std::sync::Arc;

use tracing::error;

use super::Operator;
use crate::error::OperatorError;
use crate::session::Session;

/// Callback set attached to one operator's lifecycle.
pub trait Listener<T>: Send + 'static {
    /// Called with the messages about to be handed to the body.
    fn before_message(&mut self, _op: &Operator, _messages: &[T]) -> Result<(), OperatorError> {
        Ok(())
    }

    /// Called with the messages the body just processed.
    fn after_message(&mut self, _op: &Operator, _messages: &[T]) -> Result<(), OperatorError> {
        Ok(())
    }

    /// Called once, after the loop stopped for any reason.
    fn on_complete(&mut self, _op: &Operator) -> Result<(), OperatorError> {
        Ok(())
    }

    /// Called for a processing error. Returns `true` if the error is handled.
    fn on_error(&mut self, _op: &Operator, _err: &OperatorError) -> bool {
        false
    }
}

/// Boxed listener as stored by operator descriptions.
pub type BoxListener<T> = Box<dyn Listener<T>>;

/// Error policy installed when a caller supplies no listener: log, abort the session,
/// report handled.
pub struct DefaultErrorListener {
    session: Option<Arc<dyn Session>>,
}

impl DefaultErrorListener {
    /// Creates the policy for operators of `session` (`None`: log only).
    pub fn new(session: Option<Arc<dyn Session>>) -> Self {
        Self { session }
    }
}

impl<T> Listener<T> for DefaultErrorListener {
    fn on_error(&mut self, op: &Operator, err: &OperatorError) -> bool {
        escalate(self.session.as_deref(), op, err);
        true
    }
}

/// Terminal failure response: log the error and abort the owning session.
pub(crate) fn escalate(session: Option<&dyn Session>, op: &Operator, err: &OperatorError) {
    error!(
        operator = op.name(),
        id = op.id().get(),
        label = err.as_label(),
        "operator failed: {err}"
    );
    if let Some(session) = session {
        session.abort(err);
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingSession {
        aborts: Mutex<Vec<OperatorError>>,
    }

    impl Session for RecordingSession {
        fn abort(&self, cause: &OperatorError) {
            self.aborts.lock().push(cause.clone());
        }
    }

    #[test]
    fn default_policy_aborts_and_reports_handled() {
        let session = Arc::new(RecordingSession::default());
        let mut listener = DefaultErrorListener::new(Some(session.clone()));
        let op = Operator::new(Some("failing".into()), vec![], vec![]);

        let handled = Listener::<u32>::on_error(&mut listener, &op, &OperatorError::fail("x"));

        assert!(handled);
        assert_eq!(*session.aborts.lock(), vec![OperatorError::fail("x")]);
    }

    #[test]
    fn default_policy_without_session_only_logs() {
        let mut listener = DefaultErrorListener::new(None);
        let op = Operator::new(None, vec![], vec![]);
        assert!(Listener::<u32>::on_error(&mut listener, &op, &OperatorError::fail("x")));
    }
}
