//! # Operator registry.
//!
//! Append-only list of every operator created in a session. Operators are
//! registered by the factory before their loop starts and are never removed;
//! liveness is read from each operator's own latch.
//!
//! ## Rules
//! - `register` is safe to call concurrently from any thread.
//! - Queries return snapshots; operators created afterwards are not included.
//! - [`Registry::join_all`] keeps waiting until no live operator remains,
//!   including ones registered while it waits.

use parking_lot::RwLock;

use crate::operators::Operator;

/// Session-wide list of operators.
#[derive(Default)]
pub struct Registry {
    operators: RwLock<Vec<Operator>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operator.
    pub fn register(&self, op: Operator) {
        self.operators.write().push(op);
    }

    /// Number of operators ever registered.
    pub fn len(&self) -> usize {
        self.operators.read().len()
    }

    /// True if nothing was ever registered.
    pub fn is_empty(&self) -> bool {
        self.operators.read().is_empty()
    }

    /// Snapshot of all registered operators, in registration order.
    pub fn operators(&self) -> Vec<Operator> {
        self.operators.read().clone()
    }

    /// Snapshot of operators whose loop is still running.
    pub fn live(&self) -> Vec<Operator> {
        self.operators
            .read()
            .iter()
            .filter(|op| op.is_alive())
            .cloned()
            .collect()
    }

    /// Sorted names of live operators.
    pub fn live_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .live()
            .iter()
            .map(|op| op.name().to_string())
            .collect();
        names.sort_unstable();
        names
    }

    /// Requests every registered operator to stop.
    pub fn terminate_all(&self) {
        for op in self.operators.read().iter() {
            op.terminate();
        }
    }

    /// Waits until every registered operator has stopped.
    pub async fn join_all(&self) {
        loop {
            let live = self.live();
            if live.is_empty() {
                return;
            }
            for op in live {
                op.join().await;
            }
        }
    }
}
