//! Typed channels connecting operators.
//!
//! This module groups the two channel flavours and the sum type operators
//! are wired with:
//! - [`StreamChannel`] ordered, unbounded sequence terminated by an end-of-stream token
//! - [`FutureChannel`] single-assignment value, readable any number of times once bound
//! - [`Channel`] either of the above, as accepted by the operator factory
//!
//! ## Wiring
//! ```text
//!  producer ── send/bind ──► Channel<T> ──► read ──► Operator body ──► emit ──► Channel<U>
//!                               │
//!                               └─ close() appends end-of-stream; readers see None afterwards
//! ```
//!
//! ## Rules
//! - Values sent by one producer are read in send order.
//! - No ordering across two producers writing the same stream.
//! - A stream handed to several readers delivers each value to exactly one of them.
//! - A future read as an operator input yields its value on **every** read;
//!   an operator whose inputs are all futures stops after one step.

mod future;
mod stream;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use future::FutureChannel;
pub use stream::StreamChannel;

use crate::error::ChannelError;

/// Global counter for channel ids.
static CHANNEL_SEQ: AtomicU64 = AtomicU64::new(1);

/// Bound satisfied by every value that flows through a channel.
pub trait Message: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Message for T {}

/// Process-unique channel identifier (diagnostics only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    pub(crate) fn next() -> Self {
        Self(CHANNEL_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch#{}", self.0)
    }
}

/// A stream or future channel, as consumed and produced by operators.
pub enum Channel<T> {
    /// Many values, ended by an end-of-stream token.
    Stream(StreamChannel<T>),
    /// At most one value, bound once.
    Future(FutureChannel<T>),
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        match self {
            Channel::Stream(s) => Channel::Stream(s.clone()),
            Channel::Future(f) => Channel::Future(f.clone()),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Stream(s) => f.debug_tuple("Stream").field(&s.id()).finish(),
            Channel::Future(v) => f.debug_tuple("Future").field(&v.id()).finish(),
        }
    }
}

impl<T: Message> Channel<T> {
    /// Channel identifier.
    pub fn id(&self) -> ChannelId {
        match self {
            Channel::Stream(s) => s.id(),
            Channel::Future(f) => f.id(),
        }
    }

    /// True for the single-assignment flavour.
    pub fn is_future(&self) -> bool {
        matches!(self, Channel::Future(_))
    }

    /// Reads the next value.
    ///
    /// Streams return `None` once exhausted; futures wait for their value and
    /// return it on every call.
    pub async fn read(&self) -> Option<T> {
        match self {
            Channel::Stream(s) => s.recv().await,
            Channel::Future(f) => Some(f.get().await),
        }
    }

    /// Writes a value: `send` for streams, `bind` for futures.
    pub fn write(&self, value: T) -> Result<(), ChannelError> {
        match self {
            Channel::Stream(s) => s.send(value),
            Channel::Future(f) => f.bind(value),
        }
    }

    /// Appends the end-of-stream token. No-op for futures.
    pub fn close(&self) {
        if let Channel::Stream(s) = self {
            s.close();
        }
    }
}

impl<T> From<StreamChannel<T>> for Channel<T> {
    fn from(s: StreamChannel<T>) -> Self {
        Channel::Stream(s)
    }
}

impl<T> From<&StreamChannel<T>> for Channel<T> {
    fn from(s: &StreamChannel<T>) -> Self {
        Channel::Stream(s.clone())
    }
}

impl<T> From<FutureChannel<T>> for Channel<T> {
    fn from(f: FutureChannel<T>) -> Self {
        Channel::Future(f)
    }
}

impl<T> From<&FutureChannel<T>> for Channel<T> {
    fn from(f: &FutureChannel<T>) -> Self {
        Channel::Future(f.clone())
    }
}
