//! Error types used by the opvisor runtime, its operators and channels.
//!
//! This module defines four error enums, one per failure class:
//!
//! - [`ConfigError`] - caller mistakes, reported synchronously when a
//!   combinator or the factory is invoked (no operator is created).
//! - [`OperatorError`] - failures raised while an operator runs (body,
//!   listener hooks, completion callbacks). Routed to the listener chain.
//! - [`ChannelError`] - invalid channel use (write after close, second bind).
//! - [`RuntimeError`] - outcome of a whole [`Workflow`](crate::Workflow) run.
//!
//! All of them provide `as_label` for logs/metrics.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

/// # Caller configuration mistakes.
///
/// Raised at invocation time, before anything is spawned or registered.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `subscribe` was called with no handler at all.
    #[error("subscribe requires at least one of onNext, onComplete, onError")]
    EmptyHandlers,

    /// A handler was registered under a name outside {onNext, onComplete, onError}.
    #[error("unknown handler `{key}`; expected one of onNext, onComplete, onError")]
    UnknownHandler {
        /// The rejected key, as supplied.
        key: String,
    },

    /// A handler was registered under a valid name but with the wrong callback shape.
    #[error("handler registered as `{key}` does not have the `{key}` signature")]
    HandlerMismatch {
        /// The key the handler was registered under.
        key: &'static str,
    },

    /// An operator description listed no input channel.
    #[error("operator `{operator}` declares no input channel")]
    NoInputs {
        /// Name of the rejected operator.
        operator: String,
    },

    /// The factory was invoked outside a tokio runtime.
    #[error("operator `{operator}` cannot start: no tokio runtime is active")]
    NoRuntime {
        /// Name of the rejected operator.
        operator: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use opvisor::ConfigError;
    ///
    /// assert_eq!(ConfigError::EmptyHandlers.as_label(), "config_empty_handlers");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::EmptyHandlers => "config_empty_handlers",
            ConfigError::UnknownHandler { .. } => "config_unknown_handler",
            ConfigError::HandlerMismatch { .. } => "config_handler_mismatch",
            ConfigError::NoInputs { .. } => "config_no_inputs",
            ConfigError::NoRuntime { .. } => "config_no_runtime",
        }
    }
}

/// # Invalid channel operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// A value was sent to a stream after its end-of-stream token.
    #[error("stream channel is closed")]
    Closed,

    /// A future channel was bound a second time.
    #[error("future channel is already bound")]
    AlreadyBound,
}

impl ChannelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::Closed => "channel_closed",
            ChannelError::AlreadyBound => "channel_already_bound",
        }
    }
}

/// # Failures raised while an operator runs.
///
/// Every variant is routed through the operator's listener chain; if no
/// listener reports it as handled, it escalates to a session abort.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperatorError {
    /// The body, a transform or a listener hook returned an error.
    #[error("processing failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The body or a listener hook panicked.
    #[error("operator panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// A user completion callback failed.
    #[error("completion callback failed: {error}")]
    Completion {
        /// The underlying error message.
        error: String,
    },

    /// Writing to an output channel failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl OperatorError {
    /// Builds a [`OperatorError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use opvisor::OperatorError;
    ///
    /// let err = OperatorError::fail("bad input");
    /// assert_eq!(err.to_string(), "processing failed: bad input");
    /// ```
    pub fn fail(error: impl std::fmt::Display) -> Self {
        OperatorError::Fail {
            error: error.to_string(),
        }
    }

    /// Re-labels an error raised inside a completion callback.
    pub fn into_completion(self) -> Self {
        match self {
            OperatorError::Completion { .. } => self,
            OperatorError::Fail { error } => OperatorError::Completion { error },
            other => OperatorError::Completion {
                error: other.to_string(),
            },
        }
    }

    /// Builds a [`OperatorError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        OperatorError::Panicked {
            info: panic_message(payload.as_ref()),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            OperatorError::Fail { .. } => "operator_failed",
            OperatorError::Panicked { .. } => "operator_panicked",
            OperatorError::Completion { .. } => "operator_completion_failed",
            OperatorError::Channel(e) => e.as_label(),
        }
    }
}

/// # Outcome of a workflow run.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The session was aborted by an unhandled operator failure.
    #[error("workflow aborted: {cause}")]
    Aborted {
        /// The first abort cause reported.
        cause: OperatorError,
    },

    /// Shutdown grace period was exceeded; some operators were still processing.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of operators that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use opvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Aborted { .. } => "runtime_aborted",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
