//! End-to-end pipelines driven through a `Workflow`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opvisor::{
    EventKind, Fold, FutureChannel, Handlers, OperatorError, OperatorParams, RuntimeError,
    StopReason, StreamChannel, Workflow, WorkflowConfig,
};

#[tokio::test]
async fn sum_of_stream() {
    let wf = Workflow::new(WorkflowConfig::default());
    let total = FutureChannel::new();

    wf.factory()
        .reduce(StreamChannel::of([1, 2, 3, 4]), &total, Some(0), |a: &i32, b| {
            Ok(Fold::Continue(a + b))
        })
        .unwrap();

    wf.run().await.unwrap();
    assert_eq!(total.get().await, Some(10));
}

#[tokio::test]
async fn stop_leaves_tail_unconsumed() {
    let wf = Workflow::new(WorkflowConfig::default());
    let source = StreamChannel::of([1, 2, 3]);
    let total = FutureChannel::new();

    let op = wf
        .factory()
        .reduce(&source, &total, Some(0), |a: &i32, b| {
            Ok(if b == 2 { Fold::Stop } else { Fold::Continue(a + b) })
        })
        .unwrap();

    wf.run().await.unwrap();
    assert_eq!(total.get().await, Some(1));
    assert_eq!(op.stop_reason(), Some(StopReason::Terminated));
    assert_eq!(source.try_recv(), Some(3));
}

#[tokio::test]
async fn multi_stage_pipeline_ends_in_subscriber() {
    let wf = Workflow::new(WorkflowConfig::default());
    let factory = wf.factory();
    let received = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));

    let evens = StreamChannel::new();
    factory
        .chain(
            StreamChannel::of(1..=10_u32),
            &evens,
            OperatorParams::new().with_name("double"),
            |v: u32| Ok(v * 2),
        )
        .unwrap();
    let labels = factory.map(&evens, |v: u32| Ok(format!("v{v}"))).unwrap();
    factory
        .subscribe(
            &labels,
            Handlers::new()
                .on_next({
                    let received = received.clone();
                    move |_label: String| {
                        received.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
                .on_complete({
                    let completed = completed.clone();
                    move || {
                        completed.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
        )
        .unwrap();

    wf.run().await.unwrap();
    assert_eq!(received.load(Ordering::SeqCst), 10);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(wf.operators().len(), 3);
    assert!(wf
        .operators()
        .iter()
        .all(|op| op.stop_reason() == Some(StopReason::Exhausted)));
}

#[tokio::test]
async fn failure_midway_aborts_whole_graph() {
    let wf = Workflow::new(WorkflowConfig::default().with_grace(Duration::from_secs(1)));
    let factory = wf.factory();
    let mut events = wf.bus().subscribe();

    let upstream = StreamChannel::<u32>::new();
    let parsed = factory
        .map(&upstream, |v: u32| {
            if v == 0 {
                Err(OperatorError::fail("zero is not allowed"))
            } else {
                Ok(100 / v)
            }
        })
        .unwrap();
    let total = FutureChannel::new();
    factory
        .reduce(&parsed, &total, Some(0), |a: &u32, b| Ok(Fold::Continue(a + b)))
        .unwrap();

    upstream.send(4).unwrap();
    upstream.send(0).unwrap();
    // Never closed: only the abort can stop the graph.

    let err = wf.run().await.unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Aborted {
            cause: OperatorError::fail("zero is not allowed")
        }
    );
    assert!(wf.operators().iter().all(|op| op.is_terminated()));

    let mut aborted = 0;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::SessionAborted {
            aborted += 1;
        }
    }
    assert_eq!(aborted, 1);
}

#[tokio::test]
async fn future_result_feeds_a_second_stage() {
    let wf = Workflow::new(WorkflowConfig::default());
    let factory = wf.factory();

    let total = FutureChannel::new();
    factory
        .reduce(StreamChannel::of([2, 3]), &total, None, |a: &i64, b| {
            Ok(Fold::Continue(a * b))
        })
        .unwrap();

    let doubled = FutureChannel::new();
    let stage = factory
        .chain(&total, &doubled, OperatorParams::new(), |v: Option<i64>| {
            Ok(v.unwrap_or_default() * 2)
        })
        .unwrap();

    wf.run().await.unwrap();
    assert_eq!(doubled.get().await, 12);
    assert_eq!(stage.processed(), 1);
}
