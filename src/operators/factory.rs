//! # Operator factory.
//!
//! [`OperatorFactory`] turns an [`OperatorSpec`] plus a body into a running
//! [`Operator`]:
//!
//! ```text
//! create(spec, body)
//!   ├─► validate (inputs present, tokio runtime active)    ─► ConfigError
//!   ├─► no listener supplied? ─► install DefaultErrorListener
//!   ├─► Session::registry().register(op)                    (skipped if none)
//!   ├─► Session::graph().record_operator(op)                (failure only logged)
//!   ├─► publish OperatorCreated
//!   └─► spawn OperatorLoop::run() on the worker pool        ─► Ok(op)
//! ```
//!
//! The session is passed in explicitly; a factory built with
//! [`OperatorFactory::detached`] runs operators without registry or abort
//! target (failures are only logged).

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::listener::{DefaultErrorListener, Listener};
use super::runner::OperatorLoop;
use super::{Context, Operator, OperatorSpec};
use crate::channels::{Channel, Message};
use crate::error::{ConfigError, OperatorError};
use crate::events::{Event, EventKind};
use crate::session::Session;

/// Builds, registers and starts operators.
#[derive(Clone, Default)]
pub struct OperatorFactory {
    session: Option<Arc<dyn Session>>,
}

impl OperatorFactory {
    /// Factory whose operators belong to `session`.
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Factory with no owning session.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Owning session, if any.
    pub fn session(&self) -> Option<&Arc<dyn Session>> {
        self.session.as_ref()
    }

    /// Builds an operator from a full description and starts it.
    ///
    /// The body receives one message per input, in input order.
    pub fn create<T, U, F>(&self, spec: OperatorSpec<T, U>, body: F) -> Result<Operator, ConfigError>
    where
        T: Message,
        U: Message,
        F: FnMut(&Context<U>, Vec<T>) -> Result<(), OperatorError> + Send + 'static,
    {
        let label = spec.name.clone().unwrap_or_else(|| "<unnamed>".to_string());
        if spec.inputs.is_empty() {
            return Err(ConfigError::NoInputs { operator: label });
        }
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime { operator: label })?;

        let operator = Operator::new(
            spec.name,
            spec.inputs.iter().map(Channel::id).collect(),
            spec.outputs.iter().map(Channel::id).collect(),
        );

        let mut listeners = spec.listeners;
        if listeners.is_empty() {
            listeners.push(Box::new(DefaultErrorListener::new(self.session.clone())));
        }

        self.register(&operator);

        let op_loop = OperatorLoop {
            operator: operator.clone(),
            inputs: spec.inputs,
            listeners,
            body: Box::new(body),
            ctx: Context::new(operator.clone(), spec.outputs),
            session: self.session.clone(),
        };
        runtime.spawn(op_loop.run());
        Ok(operator)
    }

    /// Shorthand: one input, one output, default error policy.
    pub fn operator<T, U, F>(
        &self,
        input: impl Into<Channel<T>>,
        output: impl Into<Channel<U>>,
        body: F,
    ) -> Result<Operator, ConfigError>
    where
        T: Message,
        U: Message,
        F: FnMut(&Context<U>, T) -> Result<(), OperatorError> + Send + 'static,
    {
        let spec = OperatorSpec::new().input(input).output(output);
        self.create(spec, single(body))
    }

    /// Shorthand: one input, one output, one listener.
    pub fn operator_with<T, U, F>(
        &self,
        input: impl Into<Channel<T>>,
        output: impl Into<Channel<U>>,
        listener: impl Listener<T>,
        body: F,
    ) -> Result<Operator, ConfigError>
    where
        T: Message,
        U: Message,
        F: FnMut(&Context<U>, T) -> Result<(), OperatorError> + Send + 'static,
    {
        let spec = OperatorSpec::new()
            .input(input)
            .output(output)
            .listener(listener);
        self.create(spec, single(body))
    }

    /// Best-effort registration and diagnostics notification.
    fn register(&self, operator: &Operator) {
        debug!(operator = operator.name(), id = operator.id().get(), "operator created");
        let Some(session) = &self.session else {
            return;
        };
        if let Some(registry) = session.registry() {
            registry.register(operator.clone());
        }
        if let Some(graph) = session.graph() {
            if let Err(e) = graph.record_operator(operator) {
                warn!(operator = operator.name(), "graph recorder failed: {e}");
            }
        }
        session.publish(Event::for_operator(EventKind::OperatorCreated, operator));
    }
}

/// Adapts a single-message body to the message-set form.
fn single<T, U, F>(
    mut body: F,
) -> impl FnMut(&Context<U>, Vec<T>) -> Result<(), OperatorError> + Send + 'static
where
    T: Message,
    U: Message,
    F: FnMut(&Context<U>, T) -> Result<(), OperatorError> + Send + 'static,
{
    move |ctx: &Context<U>, messages: Vec<T>| {
        for message in messages {
            body(ctx, message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::channels::{FutureChannel, StreamChannel};
    use crate::operators::StopReason;
    use crate::session::{BoxError, GraphRecorder, Registry};

    #[derive(Default)]
    struct TestSession {
        registry: Registry,
        aborts: Mutex<Vec<OperatorError>>,
        events: Mutex<Vec<EventKind>>,
        graph: Option<FailingGraph>,
    }

    impl Session for TestSession {
        fn registry(&self) -> Option<&Registry> {
            Some(&self.registry)
        }

        fn graph(&self) -> Option<&dyn GraphRecorder> {
            self.graph.as_ref().map(|g| g as &dyn GraphRecorder)
        }

        fn abort(&self, cause: &OperatorError) {
            self.aborts.lock().push(cause.clone());
        }

        fn publish(&self, event: Event) {
            self.events.lock().push(event.kind);
        }
    }

    struct FailingGraph {
        calls: AtomicUsize,
    }

    impl GraphRecorder for FailingGraph {
        fn record_operator(&self, _operator: &Operator) -> Result<(), BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err("graph offline".into())
        }
    }

    #[tokio::test]
    async fn operator_maps_and_propagates_end_of_stream() {
        let factory = OperatorFactory::detached();
        let input = StreamChannel::of([1, 2, 3]);
        let output = StreamChannel::new();

        let op = factory
            .operator(&input, &output, |ctx: &Context<i32>, v: i32| ctx.emit(v * 10))
            .unwrap();
        op.join().await;

        let mut out = Vec::new();
        while let Some(v) = output.recv().await {
            out.push(v);
        }
        assert_eq!(out, vec![10, 20, 30]);
        assert_eq!(op.stop_reason(), Some(StopReason::Exhausted));
        assert_eq!(op.processed(), 3);
    }

    #[tokio::test]
    async fn future_input_is_consumed_once() {
        let factory = OperatorFactory::detached();
        let out = StreamChannel::new();

        let op = factory
            .operator(FutureChannel::of(1), &out, |ctx: &Context<i32>, v: i32| ctx.emit(v))
            .unwrap();
        op.join().await;

        assert_eq!(out.recv().await, Some(1));
        assert_eq!(out.recv().await, None);
        assert_eq!(op.stop_reason(), Some(StopReason::Exhausted));
        assert_eq!(op.processed(), 1);
    }

    #[tokio::test]
    async fn future_beside_a_stream_is_reread_until_the_stream_ends() {
        let factory = OperatorFactory::detached();
        let offset = FutureChannel::of(100);
        let values = StreamChannel::of([1, 2, 3]);
        let out = StreamChannel::new();

        let spec = OperatorSpec::new().input(&values).input(&offset).output(&out);
        let op = factory
            .create(spec, |ctx: &Context<i32>, m: Vec<i32>| ctx.emit(m[0] + m[1]))
            .unwrap();
        op.join().await;

        let mut got = Vec::new();
        while let Some(v) = out.recv().await {
            got.push(v);
        }
        assert_eq!(got, vec![101, 102, 103]);
        assert_eq!(op.processed(), 3);
        assert_eq!(op.stop_reason(), Some(StopReason::Exhausted));
    }

    #[tokio::test]
    async fn multiple_inputs_are_read_in_lockstep() {
        let factory = OperatorFactory::detached();
        let left = StreamChannel::of([1, 2, 3]);
        let right = StreamChannel::of([10, 20]);
        let out = StreamChannel::new();

        let spec = OperatorSpec::named("zip").input(&left).input(&right).output(&out);
        let op = factory
            .create(spec, |ctx: &Context<i32>, m: Vec<i32>| ctx.emit(m.iter().sum()))
            .unwrap();
        op.join().await;

        assert_eq!(out.recv().await, Some(11));
        assert_eq!(out.recv().await, Some(22));
        assert_eq!(out.recv().await, None);
        assert_eq!(op.inputs(), &[left.id(), right.id()]);
    }

    #[tokio::test]
    async fn registers_and_notifies_session() {
        let session = Arc::new(TestSession {
            graph: Some(FailingGraph {
                calls: AtomicUsize::new(0),
            }),
            ..TestSession::default()
        });
        let factory = OperatorFactory::new(session.clone());

        let op = factory
            .operator(
                StreamChannel::of([1]),
                StreamChannel::new(),
                |ctx: &Context<u8>, v: u8| ctx.emit(v),
            )
            .unwrap();
        op.join().await;

        assert_eq!(session.registry.len(), 1);
        assert_eq!(session.graph.as_ref().unwrap().calls.load(Ordering::SeqCst), 1);
        let events = session.events.lock().clone();
        assert_eq!(events.first(), Some(&EventKind::OperatorCreated));
        assert_eq!(events.last(), Some(&EventKind::OperatorTerminated));
    }

    #[tokio::test]
    async fn body_error_aborts_session_once_and_stops() {
        let session = Arc::new(TestSession::default());
        let factory = OperatorFactory::new(session.clone());
        let input = StreamChannel::of([1, 2, 3]);

        let op = factory
            .operator(&input, StreamChannel::<u8>::new(), |_ctx: &Context<u8>, v: u8| {
                if v == 1 {
                    Err(OperatorError::fail("first message rejected"))
                } else {
                    Ok(())
                }
            })
            .unwrap();
        op.join().await;

        assert_eq!(
            *session.aborts.lock(),
            vec![OperatorError::fail("first message rejected")]
        );
        assert_eq!(op.stop_reason(), Some(StopReason::Failed));
        assert_eq!(op.processed(), 0);
        assert_eq!(input.try_recv(), Some(2));
    }

    #[tokio::test]
    async fn panics_become_processing_errors() {
        let session = Arc::new(TestSession::default());
        let factory = OperatorFactory::new(session.clone());

        let op = factory
            .operator(
                StreamChannel::of([0_u8]),
                StreamChannel::<u8>::new(),
                |_ctx: &Context<u8>, _v: u8| -> Result<(), OperatorError> { panic!("bad state") },
            )
            .unwrap();
        op.join().await;

        assert_eq!(
            *session.aborts.lock(),
            vec![OperatorError::Panicked {
                info: "bad state".into()
            }]
        );
    }

    #[tokio::test]
    async fn custom_listener_replaces_default_policy() {
        struct Swallow(Arc<AtomicUsize>);
        impl Listener<u8> for Swallow {
            fn on_error(&mut self, _op: &Operator, _err: &OperatorError) -> bool {
                self.0.fetch_add(1, Ordering::SeqCst);
                true
            }
        }

        let session = Arc::new(TestSession::default());
        let factory = OperatorFactory::new(session.clone());
        let seen = Arc::new(AtomicUsize::new(0));

        let op = factory
            .operator_with(
                StreamChannel::of([1_u8]),
                StreamChannel::<u8>::new(),
                Swallow(seen.clone()),
                |_ctx: &Context<u8>, _v: u8| Err(OperatorError::fail("nope")),
            )
            .unwrap();
        op.join().await;

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(session.aborts.lock().is_empty());
        assert!(op.is_terminated());
    }

    #[tokio::test]
    async fn unhandled_listener_errors_escalate() {
        struct Ignore;
        impl Listener<u8> for Ignore {}

        let session = Arc::new(TestSession::default());
        let factory = OperatorFactory::new(session.clone());
        let op = factory
            .operator_with(
                StreamChannel::of([1_u8]),
                StreamChannel::<u8>::new(),
                Ignore,
                |_ctx: &Context<u8>, _v: u8| Err(OperatorError::fail("nope")),
            )
            .unwrap();
        op.join().await;

        assert_eq!(session.aborts.lock().len(), 1);
    }

    #[tokio::test]
    async fn terminate_stops_a_waiting_operator() {
        let factory = OperatorFactory::detached();
        let input = StreamChannel::<u8>::new();
        let output = StreamChannel::<u8>::new();
        let op = factory
            .operator(&input, &output, |ctx: &Context<u8>, v: u8| ctx.emit(v))
            .unwrap();

        op.terminate();
        op.join().await;

        assert!(op.is_terminated());
        assert_eq!(op.stop_reason(), Some(StopReason::Terminated));
        assert!(output.is_closed());
        assert_eq!(input.send(1), Ok(()));
    }

    #[tokio::test]
    async fn future_output_is_bound() {
        let factory = OperatorFactory::detached();
        let result = FutureChannel::new();
        let op = factory
            .operator(StreamChannel::of([4_u32]), &result, |ctx: &Context<u32>, v: u32| {
                ctx.emit(v * v)
            })
            .unwrap();
        op.join().await;
        assert_eq!(result.get().await, 16);
    }

    #[tokio::test]
    async fn rejects_operator_without_inputs() {
        let session = Arc::new(TestSession::default());
        let factory = OperatorFactory::new(session.clone());
        let spec: OperatorSpec<u8, u8> = OperatorSpec::named("orphan");

        let err = factory
            .create(spec, |_ctx: &Context<u8>, _m: Vec<u8>| Ok(()))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::NoInputs {
                operator: "orphan".into()
            }
        );
        assert!(session.registry.is_empty());
    }

    #[test]
    fn rejects_calls_outside_a_runtime() {
        let err = OperatorFactory::detached()
            .operator(
                StreamChannel::of([1_u8]),
                StreamChannel::<u8>::new(),
                |ctx: &Context<u8>, v: u8| ctx.emit(v),
            )
            .unwrap_err();
        assert_eq!(err.as_label(), "config_no_runtime");
    }
}
