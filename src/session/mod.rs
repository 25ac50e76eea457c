//! Session boundary: what the operator runtime needs from its owner.
//!
//! The runtime never looks up ambient global state. Whoever owns the operator
//! graph hands an `Arc<dyn Session>` to the [`OperatorFactory`](crate::OperatorFactory),
//! and the factory, the operator loops and the default error policy talk to it
//! through this trait only.
//!
//! ## Contents
//! - [`Session`] registry access, fatal-error abort, event sink
//! - [`GraphRecorder`] optional diagnostics hook told about every new operator
//! - [`Registry`] append-only list of operators, with liveness queries
//!
//! [`Workflow`](crate::Workflow) is the bundled implementation; tests and
//! embedding applications may provide their own.

mod registry;

pub use registry::Registry;

use crate::error::OperatorError;
use crate::events::Event;
use crate::operators::Operator;

/// Boxed error returned by diagnostics hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Context owning a set of operators.
pub trait Session: Send + Sync + 'static {
    /// Operator registry, if this session keeps one. Registration is skipped otherwise.
    fn registry(&self) -> Option<&Registry> {
        None
    }

    /// Diagnostics graph recorder, if any.
    fn graph(&self) -> Option<&dyn GraphRecorder> {
        None
    }

    /// Fatal-error signal. Must be idempotent and safe to call concurrently.
    fn abort(&self, cause: &OperatorError);

    /// Receives lifecycle events. Default: dropped.
    fn publish(&self, _event: Event) {}
}

/// Observer notified when an operator is constructed.
///
/// Purely observational: a returned error is logged and otherwise ignored.
pub trait GraphRecorder: Send + Sync + 'static {
    /// Records a newly created operator.
    fn record_operator(&self, operator: &Operator) -> Result<(), BoxError>;
}
