//! # Stream channel: ordered, unbounded, end-of-stream terminated.
//!
//! [`StreamChannel`] is a cloneable handle over an unbounded
//! [`tokio::sync::mpsc`] queue. Producers and consumers share the same handle.
//!
//! ## Rules
//! - **FIFO per producer**: values from one producer are read in send order.
//! - **End of stream**: [`StreamChannel::close`] appends the end-of-stream token
//!   once; the reader that takes it marks the stream drained, and every read
//!   after that (by any reader) returns `None`.
//! - **Competing readers**: concurrent readers take turns on one receiver, so
//!   each value is delivered exactly once.
//! - **No write after close**: [`StreamChannel::send`] fails with
//!   [`ChannelError::Closed`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{mpsc, Mutex};

use super::ChannelId;
use crate::error::ChannelError;

/// Item carried on the underlying queue.
enum Packet<T> {
    Item(T),
    EndOfStream,
}

struct StreamInner<T> {
    id: ChannelId,
    tx: mpsc::UnboundedSender<Packet<T>>,
    rx: Mutex<mpsc::UnboundedReceiver<Packet<T>>>,
    /// Set by `close()`. Held across the enqueue so no item lands behind the end-of-stream token.
    closed: SyncMutex<bool>,
    /// Set once a reader has taken the end-of-stream token.
    drained: AtomicBool,
}

/// Ordered multi-producer/multi-consumer stream of `T`.
pub struct StreamChannel<T> {
    inner: Arc<StreamInner<T>>,
}

impl<T> Clone for StreamChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for StreamChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamChannel")
            .field("id", &self.inner.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> Default for StreamChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StreamChannel<T> {
    /// Creates an empty, open stream.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(StreamInner {
                id: ChannelId::next(),
                tx,
                rx: Mutex::new(rx),
                closed: SyncMutex::new(false),
                drained: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a stream pre-filled with `values` and already closed.
    ///
    /// # Example
    /// ```
    /// use opvisor::StreamChannel;
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() {
    ///     let s = StreamChannel::of([1, 2]);
    ///     assert_eq!(s.recv().await, Some(1));
    ///     assert_eq!(s.recv().await, Some(2));
    ///     assert_eq!(s.recv().await, None);
    /// }
    /// ```
    pub fn of(values: impl IntoIterator<Item = T>) -> Self {
        let stream = Self::new();
        for v in values {
            let _ = stream.inner.tx.send(Packet::Item(v));
        }
        stream.close();
        stream
    }

    /// Channel identifier.
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// Appends a value.
    pub fn send(&self, value: T) -> Result<(), ChannelError> {
        let closed = self.inner.closed.lock();
        if *closed {
            return Err(ChannelError::Closed);
        }
        self.inner
            .tx
            .send(Packet::Item(value))
            .map_err(|_| ChannelError::Closed)
    }

    /// Appends the end-of-stream token. Idempotent.
    pub fn close(&self) {
        let mut closed = self.inner.closed.lock();
        if !*closed {
            *closed = true;
            let _ = self.inner.tx.send(Packet::EndOfStream);
        }
    }

    /// True once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.lock()
    }

    /// True once a reader has consumed the end-of-stream token.
    pub fn is_drained(&self) -> bool {
        self.inner.drained.load(Ordering::Acquire)
    }

    /// Waits for the next value; `None` once the stream is exhausted.
    pub async fn recv(&self) -> Option<T> {
        let mut rx = self.inner.rx.lock().await;
        if self.is_drained() {
            return None;
        }
        match rx.recv().await {
            Some(Packet::Item(v)) => Some(v),
            Some(Packet::EndOfStream) | None => {
                self.inner.drained.store(true, Ordering::Release);
                None
            }
        }
    }

    /// Takes the next value if one is immediately available.
    ///
    /// Returns `None` when the queue is empty, exhausted, or another reader
    /// currently holds it.
    pub fn try_recv(&self) -> Option<T> {
        let mut rx = self.inner.rx.try_lock().ok()?;
        if self.is_drained() {
            return None;
        }
        match rx.try_recv().ok()? {
            Packet::Item(v) => Some(v),
            Packet::EndOfStream => {
                self.inner.drained.store(true, Ordering::Release);
                None
            }
        }
    }
}
