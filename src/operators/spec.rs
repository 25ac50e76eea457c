//! # Declarative operator descriptions.
//!
//! [`OperatorSpec`] is the full parameter bundle the factory consumes: name,
//! input channels, output channels and listeners. [`OperatorParams`] is the
//! part of it callers may merge into a combinator (`chain`, `map`), typically
//! to override the default error policy of one stage.
//!
//! ## Example
//! ```rust
//! use opvisor::{OperatorSpec, StreamChannel};
//!
//! let input = StreamChannel::<u32>::new();
//! let output = StreamChannel::<String>::new();
//!
//! let spec = OperatorSpec::named("stringify")
//!     .input(&input)
//!     .output(&output);
//! assert_eq!(spec.name(), Some("stringify"));
//! ```

use super::listener::{BoxListener, Listener};
use crate::channels::Channel;

/// Full description of an operator: channels plus listeners.
pub struct OperatorSpec<T, U> {
    pub(crate) name: Option<String>,
    pub(crate) inputs: Vec<Channel<T>>,
    pub(crate) outputs: Vec<Channel<U>>,
    pub(crate) listeners: Vec<BoxListener<T>>,
}

impl<T, U> Default for OperatorSpec<T, U> {
    fn default() -> Self {
        Self {
            name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

impl<T, U> OperatorSpec<T, U> {
    /// Empty, unnamed description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty description with a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().with_name(name)
    }

    /// Sets the operator name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends an input channel. Inputs are read in the order they are added.
    pub fn input(mut self, ch: impl Into<Channel<T>>) -> Self {
        self.inputs.push(ch.into());
        self
    }

    /// Appends an output channel.
    pub fn output(mut self, ch: impl Into<Channel<U>>) -> Self {
        self.outputs.push(ch.into());
        self
    }

    /// Appends a listener. Listeners run in the order they are added.
    pub fn listener(mut self, listener: impl Listener<T>) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Merges caller-supplied parameters: the name is overridden if set,
    /// listeners are appended after the ones already present.
    pub fn merge(mut self, params: OperatorParams<T>) -> Self {
        if let Some(name) = params.name {
            self.name = Some(name);
        }
        self.listeners.extend(params.listeners);
        self
    }

    /// Configured name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Extra configuration merged into a combinator's operator.
pub struct OperatorParams<T> {
    pub(crate) name: Option<String>,
    pub(crate) listeners: Vec<BoxListener<T>>,
}

impl<T> Default for OperatorParams<T> {
    fn default() -> Self {
        Self {
            name: None,
            listeners: Vec::new(),
        }
    }
}

impl<T> OperatorParams<T> {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the operator name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a listener (replaces the default error policy).
    pub fn listener(mut self, listener: impl Listener<T>) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::StreamChannel;

    struct Noop;
    impl Listener<u8> for Noop {}

    #[test]
    fn merge_overrides_name_and_appends_listeners() {
        let spec: OperatorSpec<u8, u8> = OperatorSpec::named("base")
            .input(StreamChannel::new())
            .listener(Noop)
            .merge(OperatorParams::new().with_name("custom").listener(Noop));

        assert_eq!(spec.name(), Some("custom"));
        assert_eq!(spec.listeners.len(), 2);
        assert_eq!(spec.inputs.len(), 1);
    }

    #[test]
    fn merge_keeps_name_when_params_have_none() {
        let spec: OperatorSpec<u8, u8> = OperatorSpec::named("base").merge(OperatorParams::new());
        assert_eq!(spec.name(), Some("base"));
        assert!(spec.listeners.is_empty());
    }
}
