//! # Body context.
//!
//! [`Context`] is what an operator body sees besides its messages: the output
//! channels it may emit to and its own [`Operator`] handle.

use super::Operator;
use crate::channels::{Channel, Message};
use crate::error::OperatorError;

/// Per-operator view handed to the body on every message.
pub struct Context<U> {
    operator: Operator,
    outputs: Vec<Channel<U>>,
}

impl<U: Message> Context<U> {
    pub(crate) fn new(operator: Operator, outputs: Vec<Channel<U>>) -> Self {
        Self { operator, outputs }
    }

    /// Writes `value` to every output channel (cloned for all but the last).
    pub fn emit(&self, value: U) -> Result<(), OperatorError> {
        let Some((last, rest)) = self.outputs.split_last() else {
            return Ok(());
        };
        for ch in rest {
            ch.write(value.clone())?;
        }
        last.write(value)?;
        Ok(())
    }

    /// Writes `value` to the output at `index`; out-of-range indexes are an error.
    pub fn emit_to(&self, index: usize, value: U) -> Result<(), OperatorError> {
        let ch = self.outputs.get(index).ok_or_else(|| {
            OperatorError::fail(format!(
                "operator `{}` has no output #{index}",
                self.operator.name()
            ))
        })?;
        ch.write(value)?;
        Ok(())
    }

    /// Requests this operator to stop once the current message is fully processed.
    pub fn terminate(&self) {
        self.operator.terminate();
    }

    /// This operator's handle.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Number of output channels.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Closes every output stream (end-of-stream propagates downstream).
    pub(crate) fn close_outputs(&self) {
        for ch in &self.outputs {
            ch.close();
        }
    }
}
