//! # `chain` and `map`: per-message transformation stages.
//!
//! `chain` connects a source to a target through a transform: every message read
//! from the source is transformed and the result written to the target. A future
//! source is transformed once.
//!
//! `map` is `chain` into a freshly created stream, returned to the caller.

use super::emit_each;
use crate::channels::{Channel, Message, StreamChannel};
use crate::error::{ConfigError, OperatorError};
use crate::operators::{Operator, OperatorFactory, OperatorParams, OperatorSpec};

impl OperatorFactory {
    /// Connects `source` to `target` through `transform`.
    ///
    /// `params` may rename the operator and supply listeners; without listeners
    /// the default error policy (log and abort the session) applies.
    ///
    /// # Example
    /// ```rust
    /// use opvisor::{OperatorFactory, OperatorParams, StreamChannel};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let factory = OperatorFactory::detached();
    /// let source = StreamChannel::of([1, 2, 3]);
    /// let target = StreamChannel::new();
    ///
    /// factory
    ///     .chain(&source, &target, OperatorParams::new(), |v: i32| Ok(v * 10))
    ///     .unwrap();
    ///
    /// assert_eq!(target.recv().await, Some(10));
    /// assert_eq!(target.recv().await, Some(20));
    /// assert_eq!(target.recv().await, Some(30));
    /// assert_eq!(target.recv().await, None);
    /// # }
    /// ```
    pub fn chain<T, U, F>(
        &self,
        source: impl Into<Channel<T>>,
        target: impl Into<Channel<U>>,
        params: OperatorParams<T>,
        transform: F,
    ) -> Result<Operator, ConfigError>
    where
        T: Message,
        U: Message,
        F: FnMut(T) -> Result<U, OperatorError> + Send + 'static,
    {
        let spec = OperatorSpec::new()
            .input(source)
            .output(target)
            .merge(params);
        self.create(spec, emit_each(transform))
    }

    /// Transforms `source` into a new stream channel.
    pub fn map<T, U, F>(
        &self,
        source: impl Into<Channel<T>>,
        transform: F,
    ) -> Result<StreamChannel<U>, ConfigError>
    where
        T: Message,
        U: Message,
        F: FnMut(T) -> Result<U, OperatorError> + Send + 'static,
    {
        let target = StreamChannel::new();
        self.chain(source, &target, OperatorParams::new(), transform)?;
        Ok(target)
    }
}
