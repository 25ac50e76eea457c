//! # `subscribe`: terminal sink with user callbacks.
//!
//! Attaches `onNext`, `onComplete` and `onError` callbacks to a channel. The
//! operator has no output.
//!
//! ```text
//! source ──► body: onNext(msg)     a future source is delivered once
//!   stop ──► onComplete()          skipped after an error; its failure is a Completion error
//!  error ──► onError(err)          or, if absent, log + Session::abort
//!                                  (Completion errors always take the abort path)
//! ```
//!
//! Handlers are validated before anything is created: an empty set, an unknown
//! handler name or a handler registered under the wrong name is a
//! [`ConfigError`].

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;

use crate::channels::{Channel, Message};
use crate::error::{ConfigError, OperatorError};
use crate::operators::{escalate, Context, Listener, Operator, OperatorFactory, OperatorSpec};
use crate::session::Session;

type NextFn<T> = Box<dyn FnMut(T) -> Result<(), OperatorError> + Send>;
type CompleteFn = Box<dyn FnMut() -> Result<(), OperatorError> + Send>;
type ErrorFn = Box<dyn FnMut(&OperatorError) + Send>;

/// Name of a subscribe callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKey {
    /// Called for every message.
    OnNext,
    /// Called once when the source is exhausted (or the operator terminated).
    OnComplete,
    /// Called when processing fails.
    OnError,
}

impl HandlerKey {
    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKey::OnNext => "onNext",
            HandlerKey::OnComplete => "onComplete",
            HandlerKey::OnError => "onError",
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onNext" => Ok(HandlerKey::OnNext),
            "onComplete" => Ok(HandlerKey::OnComplete),
            "onError" => Ok(HandlerKey::OnError),
            other => Err(ConfigError::UnknownHandler {
                key: other.to_string(),
            }),
        }
    }
}

/// One subscribe callback, tagged by shape.
pub enum Handler<T> {
    /// `onNext` callback.
    Next(NextFn<T>),
    /// `onComplete` callback.
    Complete(CompleteFn),
    /// `onError` callback.
    Error(ErrorFn),
}

impl<T> Handler<T> {
    /// Wraps an `onNext` callback.
    pub fn next(f: impl FnMut(T) -> Result<(), OperatorError> + Send + 'static) -> Self {
        Handler::Next(Box::new(f))
    }

    /// Wraps an `onComplete` callback.
    pub fn complete(f: impl FnMut() -> Result<(), OperatorError> + Send + 'static) -> Self {
        Handler::Complete(Box::new(f))
    }

    /// Wraps an `onError` callback.
    pub fn error(f: impl FnMut(&OperatorError) + Send + 'static) -> Self {
        Handler::Error(Box::new(f))
    }

    /// The key this handler's shape corresponds to.
    pub fn key(&self) -> HandlerKey {
        match self {
            Handler::Next(_) => HandlerKey::OnNext,
            Handler::Complete(_) => HandlerKey::OnComplete,
            Handler::Error(_) => HandlerKey::OnError,
        }
    }
}

/// Callback set passed to [`OperatorFactory::subscribe`].
///
/// # Example
/// ```rust
/// use opvisor::{Handler, Handlers};
///
/// let typed: Handlers<u32> = Handlers::new().on_next(|v| {
///     println!("{v}");
///     Ok(())
/// });
/// assert!(!typed.is_empty());
///
/// let named = Handlers::<u32>::from_named([("onFinish", Handler::complete(|| Ok(())))]);
/// assert!(named.is_err());
/// ```
pub struct Handlers<T> {
    on_next: Option<NextFn<T>>,
    on_complete: Option<CompleteFn>,
    on_error: Option<ErrorFn>,
}

impl<T> Default for Handlers<T> {
    fn default() -> Self {
        Self {
            on_next: None,
            on_complete: None,
            on_error: None,
        }
    }
}

impl<T> Handlers<T> {
    /// Empty set (rejected by `subscribe` until a callback is added).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from `(name, handler)` pairs.
    pub fn from_named<K, I>(entries: I) -> Result<Self, ConfigError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Handler<T>)>,
    {
        let mut handlers = Self::new();
        for (key, handler) in entries {
            handlers.insert(key.as_ref(), handler)?;
        }
        Ok(handlers)
    }

    /// Sets the `onNext` callback.
    pub fn on_next(mut self, f: impl FnMut(T) -> Result<(), OperatorError> + Send + 'static) -> Self {
        self.on_next = Some(Box::new(f));
        self
    }

    /// Sets the `onComplete` callback.
    pub fn on_complete(mut self, f: impl FnMut() -> Result<(), OperatorError> + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Sets the `onError` callback.
    pub fn on_error(mut self, f: impl FnMut(&OperatorError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Registers `handler` under `key`; the name must be known and match the handler's shape.
    pub fn insert(&mut self, key: &str, handler: Handler<T>) -> Result<(), ConfigError> {
        let key: HandlerKey = key.parse()?;
        if key != handler.key() {
            return Err(ConfigError::HandlerMismatch { key: key.as_str() });
        }
        match handler {
            Handler::Next(f) => self.on_next = Some(f),
            Handler::Complete(f) => self.on_complete = Some(f),
            Handler::Error(f) => self.on_error = Some(f),
        }
        Ok(())
    }

    /// True if no callback is set.
    pub fn is_empty(&self) -> bool {
        self.on_next.is_none() && self.on_complete.is_none() && self.on_error.is_none()
    }
}

/// Completion and error side of a subscription.
struct SubscribeListener {
    on_complete: Option<CompleteFn>,
    on_error: Option<ErrorFn>,
    errored: bool,
    completing: bool,
    session: Option<Arc<dyn Session>>,
}

impl<T> Listener<T> for SubscribeListener {
    fn on_complete(&mut self, _op: &Operator) -> Result<(), OperatorError> {
        if self.errored {
            return Ok(());
        }
        let Some(callback) = self.on_complete.as_mut() else {
            return Ok(());
        };
        self.completing = true;
        panic::catch_unwind(AssertUnwindSafe(|| callback()))
            .unwrap_or_else(|payload| Err(OperatorError::from_panic(payload)))
            .map_err(OperatorError::into_completion)
    }

    fn on_error(&mut self, op: &Operator, err: &OperatorError) -> bool {
        // A failed onComplete is left unhandled so the loop escalates it.
        if self.completing {
            return false;
        }
        self.errored = true;
        match self.on_error.as_mut() {
            Some(callback) => callback(err),
            None => escalate(self.session.as_deref(), op, err),
        }
        true
    }
}

impl OperatorFactory {
    /// Attaches `handlers` to `source` as a terminal sink.
    ///
    /// A future source is delivered once.
    pub fn subscribe<T: Message>(
        &self,
        source: impl Into<Channel<T>>,
        handlers: Handlers<T>,
    ) -> Result<Operator, ConfigError> {
        if handlers.is_empty() {
            return Err(ConfigError::EmptyHandlers);
        }
        let Handlers {
            mut on_next,
            on_complete,
            on_error,
        } = handlers;

        let listener = SubscribeListener {
            on_complete,
            on_error,
            errored: false,
            completing: false,
            session: self.session().cloned(),
        };
        let spec: OperatorSpec<T, ()> = OperatorSpec::new().input(source).listener(listener);

        self.create(spec, move |_ctx: &Context<()>, messages: Vec<T>| {
            if let Some(callback) = on_next.as_mut() {
                for message in messages {
                    callback(message)?;
                }
            }
            Ok(())
        })
    }
}
