//! # Workflow configuration.
//!
//! [`WorkflowConfig`] holds the settings of one [`Workflow`](crate::Workflow):
//! how long a graceful shutdown may take and how many events the bus buffers.

use std::time::Duration;

/// Settings for a workflow session.
///
/// ## Field semantics
/// - `grace`: maximum wait for operators to stop after a shutdown or abort
///   (`0s` = do not wait)
/// - `bus_capacity`: event bus ring buffer size (min 1; see [`Self::bus_capacity_clamped`])
#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    /// Maximum time to wait for operators to stop.
    ///
    /// When shutdown is requested every operator is terminated and the
    /// workflow waits up to `grace`; past it, `RuntimeError::GraceExceeded`
    /// reports the operators still running.
    pub grace: Duration,

    /// Capacity of the event bus broadcast ring buffer.
    ///
    /// A lagging subscriber listener skips the oldest events.
    pub bus_capacity: usize,
}

impl WorkflowConfig {
    /// Sets the grace period.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Sets the bus capacity.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for WorkflowConfig {
    /// `grace = 60s`, `bus_capacity = 1024`.
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let cfg = WorkflowConfig::default();
        assert_eq!(cfg.grace, Duration::from_secs(60));
        assert_eq!(cfg.bus_capacity, 1024);

        let cfg = cfg.with_bus_capacity(0).with_grace(Duration::ZERO);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.grace, Duration::ZERO);
    }
}
