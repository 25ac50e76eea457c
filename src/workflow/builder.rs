use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{Workflow, WorkflowConfig};
use crate::events::Bus;
use crate::session::{GraphRecorder, Registry};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for a [`Workflow`] with optional subscribers and graph recorder.
pub struct WorkflowBuilder {
    cfg: WorkflowConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    graph: Option<Box<dyn GraphRecorder>>,
}

impl WorkflowBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: WorkflowConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            graph: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive lifecycle events (operator created/failed/terminated,
    /// abort, shutdown) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the recorder told about every operator the workflow's factory creates.
    pub fn with_graph(mut self, graph: impl GraphRecorder) -> Self {
        self.graph = Some(Box::new(graph));
        self
    }

    /// Builds the workflow.
    ///
    /// Must be called inside a tokio runtime: subscriber workers and the bus
    /// listener are spawned here.
    pub fn build(self) -> Arc<Workflow> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let listener_token = CancellationToken::new();

        if !subs.is_empty() {
            spawn_subscriber_listener(&bus, Arc::clone(&subs), listener_token.clone());
        }

        Arc::new(Workflow {
            cfg: self.cfg,
            bus,
            subs,
            registry: Registry::new(),
            graph: self.graph,
            runtime_token: CancellationToken::new(),
            listener_token,
            abort_cause: Default::default(),
        })
    }
}

/// Forwards bus events to the subscriber set until the workflow is dropped.
fn spawn_subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>, stop: CancellationToken) {
    // Subscribe before returning so no event published after build() is missed.
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = stop.cancelled() => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber listener lagged behind the event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
