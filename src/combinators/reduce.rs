//! # `reduce`: fold a channel into a single future value.
//!
//! The accumulator starts at the seed (or at the first message when there is no
//! seed). For every later message the transform returns a [`Fold`] decision:
//!
//! ```text
//! Continue(v) ─► accumulator = v
//! Skip        ─► accumulator unchanged
//! Stop        ─► accumulator unchanged, operator terminates (remaining input unread)
//! ```
//!
//! When the operator stops without error the accumulator is bound to the result
//! channel; `None` means there was no seed and the source was empty. After a
//! failed fold nothing is bound and the error takes the default path (log and
//! abort the session).

use std::fmt;
use std::marker::PhantomData;

use super::emit_each;
use crate::channels::{Channel, FutureChannel, Message};
use crate::error::{ConfigError, OperatorError};
use crate::operators::{Listener, Operator, OperatorFactory, OperatorSpec};

/// Decision returned by a reduce transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fold<T> {
    /// Replace the accumulator.
    Continue(T),
    /// Keep the accumulator, go on with the next message.
    Skip,
    /// Keep the accumulator and stop consuming.
    Stop,
}

/// Accumulator state, updated after the stage body has seen each message.
struct ReduceListener<T, F> {
    accumulator: Option<T>,
    transform: F,
    result: FutureChannel<Option<T>>,
    failed: bool,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> Listener<T> for ReduceListener<T, F>
where
    T: Message,
    F: FnMut(&T, T) -> Result<Fold<T>, OperatorError> + Send + 'static,
{
    fn after_message(&mut self, op: &Operator, messages: &[T]) -> Result<(), OperatorError> {
        for item in messages.iter().cloned() {
            let step = match &self.accumulator {
                None => Fold::Continue(item),
                Some(acc) => (self.transform)(acc, item)?,
            };
            match step {
                Fold::Continue(next) => self.accumulator = Some(next),
                Fold::Skip => {}
                Fold::Stop => {
                    op.terminate();
                    break;
                }
            }
        }
        Ok(())
    }

    fn on_complete(&mut self, _op: &Operator) -> Result<(), OperatorError> {
        if self.failed {
            return Ok(());
        }
        self.result.bind(self.accumulator.take())?;
        Ok(())
    }

    fn on_error(&mut self, _op: &Operator, _err: &OperatorError) -> bool {
        self.failed = true;
        false
    }
}

impl<T, F> fmt::Debug for ReduceListener<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReduceListener")
            .field("result", &self.result.id())
            .field("has_accumulator", &self.accumulator.is_some())
            .field("failed", &self.failed)
            .finish()
    }
}

impl OperatorFactory {
    /// Folds `source` with `transform` and binds the outcome to `result`.
    ///
    /// # Example
    /// ```rust
    /// use opvisor::{Fold, FutureChannel, OperatorFactory, StreamChannel};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let factory = OperatorFactory::detached();
    /// let total = FutureChannel::new();
    ///
    /// factory
    ///     .reduce(StreamChannel::of([1, 2, 3, 4]), &total, Some(0), |acc: &i32, v| {
    ///         Ok(Fold::Continue(acc + v))
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(total.get().await, Some(10));
    /// # }
    /// ```
    pub fn reduce<T, F>(
        &self,
        source: impl Into<Channel<T>>,
        result: &FutureChannel<Option<T>>,
        seed: Option<T>,
        transform: F,
    ) -> Result<Operator, ConfigError>
    where
        T: Message,
        F: FnMut(&T, T) -> Result<Fold<T>, OperatorError> + Send + 'static,
    {
        let listener = ReduceListener {
            accumulator: seed,
            transform,
            result: result.clone(),
            failed: false,
            _marker: PhantomData,
        };
        // No output: the fold result leaves through the listener.
        let spec: OperatorSpec<T, ()> = OperatorSpec::new().input(source).listener(listener);
        self.create(spec, emit_each(|_message: T| Ok(())))
    }
}
