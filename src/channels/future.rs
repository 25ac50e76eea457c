//! # Future channel: single-assignment value.
//!
//! [`FutureChannel`] holds at most one value. The first [`bind`](FutureChannel::bind)
//! wins; any later bind fails with [`ChannelError::AlreadyBound`] and leaves the
//! stored value untouched. Readers wait until the value exists and then always
//! see the same value.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::Notify;

use super::ChannelId;
use crate::error::ChannelError;

struct FutureInner<T> {
    id: ChannelId,
    value: OnceLock<T>,
    bound: Notify,
}

/// Single-assignment channel of `T`.
pub struct FutureChannel<T> {
    inner: Arc<FutureInner<T>>,
}

impl<T> Clone for FutureChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for FutureChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureChannel")
            .field("id", &self.inner.id)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl<T> Default for FutureChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FutureChannel<T> {
    /// Creates an unbound future.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FutureInner {
                id: ChannelId::next(),
                value: OnceLock::new(),
                bound: Notify::new(),
            }),
        }
    }

    /// Creates a future already bound to `value`.
    pub fn of(value: T) -> Self {
        let fut = Self::new();
        let _ = fut.inner.value.set(value);
        fut
    }

    /// Channel identifier.
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// Binds the value. Only the first call succeeds.
    pub fn bind(&self, value: T) -> Result<(), ChannelError> {
        self.inner
            .value
            .set(value)
            .map_err(|_| ChannelError::AlreadyBound)?;
        self.inner.bound.notify_waiters();
        Ok(())
    }

    /// True once a value is bound.
    pub fn is_bound(&self) -> bool {
        self.inner.value.get().is_some()
    }
}

impl<T: Clone> FutureChannel<T> {
    /// Returns the value if already bound.
    pub fn try_get(&self) -> Option<T> {
        self.inner.value.get().cloned()
    }

    /// Waits until the value is bound and returns a clone of it.
    pub async fn get(&self) -> T {
        loop {
            let notified = self.inner.bound.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(v) = self.inner.value.get() {
                return v.clone();
            }
            notified.await;
        }
    }
}
