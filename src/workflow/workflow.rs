//! # Workflow: a ready-made session for operator graphs.
//!
//! [`Workflow`] owns the event bus, a [`SubscriberSet`], the operator
//! [`Registry`] and an abort latch. Operators join it through
//! [`Workflow::factory`]; a fatal error anywhere aborts the whole graph.
//!
//! ## Lifecycle
//! ```text
//! build()
//!   └─► Bus + SubscriberSet (+ bus listener) + Registry + runtime token
//!
//! factory().chain(..) / .reduce(..) / .subscribe(..)
//!   └─► operators register here and publish lifecycle events on the bus
//!
//! run():
//!   ├─ all registered operators stopped          ─► Ok(())
//!   ├─ abort(cause)  ── first cause wins ─► SessionAborted
//!   │                    ├─► terminate every operator
//!   │                    └─► cancel runtime token ─► Err(Aborted { cause })
//!   └─ OS signal ─► shutdown():
//!        ShutdownRequested ─► terminate all ─► wait up to grace
//!           ├─ all joined  ─► AllStoppedWithin ─► Ok(())
//!           └─ timeout     ─► GraceExceeded    ─► Err(GraceExceeded { stuck })
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use opvisor::{Fold, FutureChannel, LogWriter, StreamChannel, Workflow, WorkflowConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wf = Workflow::builder(WorkflowConfig::default())
//!         .with_subscribers(vec![Arc::new(LogWriter::new())])
//!         .build();
//!     let factory = wf.factory();
//!
//!     let squares = factory.map(StreamChannel::of(1..=3), |v: u64| Ok(v * v))?;
//!     let total = FutureChannel::new();
//!     factory.reduce(&squares, &total, Some(0), |acc: &u64, v| Ok(Fold::Continue(acc + v)))?;
//!
//!     wf.run().await?;
//!     assert_eq!(total.get().await, Some(14));
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use super::{shutdown, WorkflowBuilder, WorkflowConfig};
use crate::error::{OperatorError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::operators::{Operator, OperatorFactory};
use crate::session::{GraphRecorder, Registry, Session};
use crate::subscribers::SubscriberSet;

/// Session owning an operator graph, its events and its abort latch.
pub struct Workflow {
    pub(super) cfg: WorkflowConfig,
    pub(super) bus: Bus,
    pub(super) subs: Arc<SubscriberSet>,
    pub(super) registry: Registry,
    pub(super) graph: Option<Box<dyn GraphRecorder>>,
    pub(super) runtime_token: CancellationToken,
    pub(super) listener_token: CancellationToken,
    pub(super) abort_cause: OnceLock<OperatorError>,
}

impl Workflow {
    /// Starts building a workflow.
    pub fn builder(cfg: WorkflowConfig) -> WorkflowBuilder {
        WorkflowBuilder::new(cfg)
    }

    /// Workflow with no subscribers and no graph recorder.
    pub fn new(cfg: WorkflowConfig) -> Arc<Self> {
        Self::builder(cfg).build()
    }

    /// Factory whose operators belong to this workflow.
    pub fn factory(self: &Arc<Self>) -> OperatorFactory {
        OperatorFactory::new(Arc::clone(self) as Arc<dyn Session>)
    }

    /// Configuration in use.
    pub fn config(&self) -> &WorkflowConfig {
        &self.cfg
    }

    /// Event bus; `bus().subscribe()` observes raw events without a subscriber.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Number of configured subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Every operator created through this workflow, in creation order.
    pub fn operators(&self) -> Vec<Operator> {
        self.registry.operators()
    }

    /// Token cancelled when the workflow is aborted or shut down.
    pub fn token(&self) -> CancellationToken {
        self.runtime_token.clone()
    }

    /// True once [`Session::abort`] has been called.
    pub fn is_aborted(&self) -> bool {
        self.abort_cause.get().is_some()
    }

    /// The error that aborted the workflow, if any.
    pub fn abort_cause(&self) -> Option<&OperatorError> {
        self.abort_cause.get()
    }

    /// Drives the workflow to completion.
    ///
    /// Returns once every registered operator has stopped, the workflow is
    /// aborted, or a termination signal triggered a graceful [`shutdown`](Self::shutdown).
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let signal = async {
            if let Err(e) = shutdown::wait_for_shutdown_signal().await {
                warn!("cannot listen for termination signals: {e}");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = self.runtime_token.cancelled() => {
                // Give terminated operators their completion hooks.
                let _ = tokio::time::timeout(self.cfg.grace, self.registry.join_all()).await;
            }
            _ = self.registry.join_all() => {}
            _ = signal => return self.shutdown().await,
        }

        match self.abort_cause() {
            Some(cause) => Err(RuntimeError::Aborted {
                cause: cause.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Stops every operator and waits up to the configured grace period.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.registry.terminate_all();

        let grace = self.cfg.grace;
        let joined = tokio::time::timeout(grace, self.registry.join_all()).await;
        self.runtime_token.cancel();

        match joined {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck = self.registry.live_names();
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

impl Session for Workflow {
    fn registry(&self) -> Option<&Registry> {
        Some(&self.registry)
    }

    fn graph(&self) -> Option<&dyn GraphRecorder> {
        self.graph.as_deref()
    }

    fn abort(&self, cause: &OperatorError) {
        if self.abort_cause.set(cause.clone()).is_err() {
            return;
        }
        error!(label = cause.as_label(), "workflow aborted: {cause}");
        self.bus
            .publish(Event::new(EventKind::SessionAborted).with_reason(cause.to_string()));
        self.registry.terminate_all();
        self.runtime_token.cancel();
    }

    fn publish(&self, event: Event) {
        self.bus.publish(event);
    }
}

impl Drop for Workflow {
    fn drop(&mut self) {
        self.listener_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    use super::*;
    use crate::channels::StreamChannel;
    use crate::operators::StopReason;
    use crate::session::BoxError;
    use crate::subscribers::Subscribe;

    struct Forward(mpsc::UnboundedSender<Event>);

    #[async_trait]
    impl Subscribe for Forward {
        async fn on_event(&self, ev: &Event) {
            let _ = self.0.send(ev.clone());
        }
        fn name(&self) -> &'static str {
            "forward"
        }
    }

    fn observed(cfg: WorkflowConfig) -> (Arc<Workflow>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let wf = Workflow::builder(cfg)
            .with_subscribers(vec![Arc::new(Forward(tx))])
            .build();
        (wf, rx)
    }

    async fn next_of(rx: &mut mpsc::UnboundedReceiver<Event>, kind: EventKind) -> Event {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let ev = rx.recv().await.expect("subscriber closed");
                if ev.kind == kind {
                    return ev;
                }
            }
        })
        .await
        .expect("event not delivered")
    }

    #[tokio::test]
    async fn run_completes_when_operators_are_exhausted() {
        let wf = Workflow::new(WorkflowConfig::default());
        let out = wf.factory().map(StreamChannel::of([1, 2]), |v: i32| Ok(v + 1)).unwrap();

        wf.run().await.unwrap();
        assert_eq!(out.try_recv(), Some(2));
        assert_eq!(out.try_recv(), Some(3));
        assert!(wf.operators().iter().all(|op| op.is_terminated()));
        assert!(!wf.is_aborted());
    }

    #[tokio::test]
    async fn abort_is_idempotent_and_first_cause_wins() {
        let (wf, mut rx) = observed(WorkflowConfig::default());
        let idle = StreamChannel::<u8>::new();
        let _out = wf.factory().map(&idle, |v: u8| Ok(v)).unwrap();

        wf.abort(&OperatorError::fail("first"));
        wf.abort(&OperatorError::fail("second"));

        assert_eq!(wf.abort_cause(), Some(&OperatorError::fail("first")));
        assert!(wf.token().is_cancelled());

        let ev = next_of(&mut rx, EventKind::SessionAborted).await;
        assert_eq!(ev.reason.as_deref(), Some("processing failed: first"));

        wf.registry.join_all().await;
        let all = wf.operators();
        assert_eq!(all[0].stop_reason(), Some(StopReason::Terminated));

        // Only one abort event ever reaches subscribers.
        tokio::time::sleep(Duration::from_millis(20)).await;
        while let Ok(ev) = rx.try_recv() {
            assert_ne!(ev.kind, EventKind::SessionAborted);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_aborts_publish_a_single_event() {
        let wf = Workflow::new(WorkflowConfig::default());
        let mut rx = wf.bus().subscribe();
        let _out = wf.factory().map(StreamChannel::<u8>::new(), |v: u8| Ok(v)).unwrap();

        let barrier = Arc::new(tokio::sync::Barrier::new(16));
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let wf = wf.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    wf.abort(&OperatorError::fail(format!("cause-{i}")));
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let cause = wf.abort_cause().cloned().unwrap();
        assert!(cause.to_string().starts_with("processing failed: cause-"));
        assert!(wf.token().is_cancelled());

        let mut aborted = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::SessionAborted {
                aborted.push(ev);
            }
        }
        assert_eq!(aborted.len(), 1);
        assert_eq!(aborted[0].reason.as_deref(), Some(cause.to_string().as_str()));
    }

    #[tokio::test]
    async fn failing_operator_aborts_run_and_stops_the_rest() {
        let wf = Workflow::new(WorkflowConfig::default());
        let factory = wf.factory();

        let idle = StreamChannel::<u32>::new();
        let _waiting = factory.map(&idle, |v: u32| Ok(v)).unwrap();
        let _failing = factory
            .map(StreamChannel::of([1_u32]), |_v: u32| -> Result<u32, _> {
                Err(OperatorError::fail("boom"))
            })
            .unwrap();

        let err = wf.run().await.unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Aborted {
                cause: OperatorError::fail("boom")
            }
        );
        assert!(wf.operators().iter().all(|op| op.is_terminated()));
    }

    #[tokio::test]
    async fn shutdown_stops_idle_operators_within_grace() {
        let (wf, mut rx) = observed(WorkflowConfig::default().with_grace(Duration::from_secs(1)));
        let idle = StreamChannel::<u32>::new();
        let out = wf.factory().map(&idle, |v: u32| Ok(v)).unwrap();

        wf.shutdown().await.unwrap();
        assert_eq!(out.recv().await, None);
        next_of(&mut rx, EventKind::ShutdownRequested).await;
        next_of(&mut rx, EventKind::AllStoppedWithin).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_reports_stuck_operators() {
        let wf = Workflow::new(WorkflowConfig::default().with_grace(Duration::from_millis(50)));
        let slow = wf
            .factory()
            .chain(
                StreamChannel::of([1_u32]),
                StreamChannel::<u32>::new(),
                crate::OperatorParams::new().with_name("slow"),
                |v: u32| {
                    std::thread::sleep(Duration::from_millis(400));
                    Ok(v)
                },
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = wf.shutdown().await.unwrap_err();
        assert_eq!(
            err,
            RuntimeError::GraceExceeded {
                grace: Duration::from_millis(50),
                stuck: vec!["slow".to_string()],
            }
        );
        slow.join().await;
    }

    struct NameLog(Arc<Mutex<Vec<String>>>);

    impl GraphRecorder for NameLog {
        fn record_operator(&self, op: &Operator) -> Result<(), BoxError> {
            self.0.lock().push(op.name().to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn graph_recorder_sees_every_operator() {
        let names = Arc::new(Mutex::new(Vec::new()));
        let wf = Workflow::builder(WorkflowConfig::default())
            .with_graph(NameLog(names.clone()))
            .build();

        let params = crate::OperatorParams::new().with_name("first");
        wf.factory()
            .chain(StreamChannel::of([1]), StreamChannel::new(), params, |v: i32| Ok(v))
            .unwrap();
        wf.run().await.unwrap();

        assert_eq!(*names.lock(), vec!["first".to_string()]);
    }
}
