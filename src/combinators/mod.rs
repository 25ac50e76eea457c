//! Combinators: ready-made operators built on [`OperatorFactory::create`].
//!
//! - [`OperatorFactory::subscribe`] terminal sink with `onNext` / `onComplete` / `onError`
//! - [`OperatorFactory::chain`] source ──transform──► target
//! - [`OperatorFactory::map`] `chain` into a new stream
//! - [`OperatorFactory::reduce`] fold into a [`FutureChannel`](crate::FutureChannel), steered by [`Fold`]
//!
//! All of them read a single source. A future source is consumed once: the
//! operator loop stops after the first message.
//!
//! [`OperatorFactory::create`]: crate::OperatorFactory::create
//! [`OperatorFactory::subscribe`]: crate::OperatorFactory::subscribe
//! [`OperatorFactory::chain`]: crate::OperatorFactory::chain
//! [`OperatorFactory::map`]: crate::OperatorFactory::map
//! [`OperatorFactory::reduce`]: crate::OperatorFactory::reduce

mod chain;
mod reduce;
mod subscribe;

pub use reduce::Fold;
pub use subscribe::{Handler, HandlerKey, Handlers};

use crate::channels::Message;
use crate::error::OperatorError;
use crate::operators::Context;

/// Body shared by the single-input stages: transform each message and emit it.
pub(crate) fn emit_each<T, U, F>(
    mut transform: F,
) -> impl FnMut(&Context<U>, Vec<T>) -> Result<(), OperatorError> + Send + 'static
where
    T: Message,
    U: Message,
    F: FnMut(T) -> Result<U, OperatorError> + Send + 'static,
{
    move |ctx: &Context<U>, messages: Vec<T>| {
        for message in messages {
            ctx.emit(transform(message)?)?;
        }
        Ok(())
    }
}
