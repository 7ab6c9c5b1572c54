//! # OperationQueue: FIFO executor on the tokio runtime.
//!
//! The [`OperationQueue`] owns the event bus, the registry of live operations and a
//! dispatcher task. It implements [`Executor`], so it can back
//! [`InOperationQueue`](crate::InOperationQueue) publishers.
//!
//! ## Architecture
//! ```text
//! submit(op) ──► enqueue() ──► Registry.insert(id) ──► publish OperationEnqueued
//!                                   │
//!                                   └──► mpsc(id) ──► dispatcher (FIFO)
//!                                                        ├─ acquire permit (if max_concurrent > 0)
//!                                                        ├─ Registry.get(id)? else skip (cancelled)
//!                                                        └─ spawn worker:
//!                                                             run_once(op)   (blocking pool)
//!                                                             release permit
//!                                                             Registry.take(id) ──► publish Finished|Cancelled
//!
//! cancel(id)  ──► Registry.take(id) ──► op.cancel() ──► publish OperationCancelled
//! shutdown()  ──► runtime_token.cancel() ──► Registry.drain() ──► op.cancel() for each
//!                 ──► publish QueueShutdown ──► listener closes the ObserverSet
//! ```
//!
//! ## Rules
//! - Operations start in submission order; at most `max_concurrent` are between
//!   `run` and their terminal state at any time.
//! - An operation cancelled before its turn is never run.
//! - Exactly one terminal event per submitted operation.
//! - `cancel` never blocks on the worker.
//! - `QueueShutdown` is the last event observers receive; their lanes are then
//!   drained and closed.
//!
//! ## Example
//! ```rust
//! use streamtraits::{
//!     Executor, Just, OperationQueue, Outcome, QueueConfig, SingleOperation,
//! };
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() {
//!     let queue = OperationQueue::new(QueueConfig::serial());
//!
//!     let op = SingleOperation::new(Just::<u32, String>::new(42));
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     op.observe_completion(move |outcome| {
//!         let _ = tx.send(outcome);
//!     })
//!     .expect("fresh operation");
//!
//!     queue.submit(op);
//!     assert_eq!(rx.await.unwrap(), Outcome::Completed(Ok(42)));
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::{builder::QueueBuilder, config::QueueConfig, registry::Registry, runner};
use crate::events::{Bus, Event, EventKind};
use crate::observers::ObserverSet;
use crate::operations::{Executor, OperationId, OperationRef, OperationState};

/// Tokio-backed executor running operations in FIFO order.
pub struct OperationQueue {
    cfg: QueueConfig,
    bus: Bus,
    registry: Arc<Registry>,
    next_id: AtomicU64,
    tx: mpsc::UnboundedSender<OperationId>,
    runtime_token: CancellationToken,
    shut_down: AtomicBool,
}

impl OperationQueue {
    /// Returns a builder for a queue with observers.
    pub fn builder(cfg: QueueConfig) -> QueueBuilder {
        QueueBuilder::new(cfg)
    }

    /// Creates a queue without observers.
    ///
    /// # Panics
    /// If called outside a tokio runtime.
    pub fn new(cfg: QueueConfig) -> Arc<Self> {
        Self::builder(cfg).build()
    }

    pub(super) fn start(
        cfg: QueueConfig,
        bus: Bus,
        observers: ObserverSet,
        registry: Arc<Registry>,
        runtime_token: CancellationToken,
        semaphore: Option<Arc<Semaphore>>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        observer_listener(&bus, observers);
        tokio::spawn(dispatch(
            rx,
            Arc::clone(&registry),
            semaphore,
            bus.clone(),
            runtime_token.clone(),
        ));

        Arc::new(Self {
            cfg,
            bus,
            registry,
            next_id: AtomicU64::new(0),
            tx,
            runtime_token,
            shut_down: AtomicBool::new(false),
        })
    }

    /// The configuration this queue was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.cfg
    }

    /// Creates a receiver for events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Stops the queue: cancels every pending and executing operation.
    ///
    /// Operations submitted afterwards are cancelled immediately. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.runtime_token.cancel();

        for (id, op) in self.registry.drain() {
            op.cancel();
            publish_terminal(&self.bus, &op, id, Some("queue shutdown"));
        }
        self.bus.publish(Event::new(EventKind::QueueShutdown));
    }

    /// Returns true once [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Number of operations submitted and not yet terminated.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True if no operation is pending or executing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the sorted ids of pending and executing operations.
    pub fn list(&self) -> Vec<OperationId> {
        self.registry.list()
    }

    fn reject(&self, op: &OperationRef, id: OperationId) {
        op.cancel();
        publish_terminal(&self.bus, op, id, Some("queue is shut down"));
    }
}

impl Executor for OperationQueue {
    fn submit(&self, operation: OperationRef) -> OperationId {
        let id = OperationId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        if self.runtime_token.is_cancelled() {
            self.reject(&operation, id);
            return id;
        }

        operation.enqueue();
        self.registry.insert(id, Arc::clone(&operation));
        self.bus.publish(
            Event::new(EventKind::OperationEnqueued)
                .with_operation(operation.name())
                .with_id(id),
        );

        // Shutdown may have drained the registry before the insert above.
        if (self.runtime_token.is_cancelled() || self.tx.send(id).is_err())
            && let Some(op) = self.registry.take(id)
        {
            self.reject(&op, id);
        }
        id
    }

    fn cancel(&self, id: OperationId) {
        if let Some(op) = self.registry.take(id) {
            op.cancel();
            publish_terminal(&self.bus, &op, id, Some("cancelled by caller"));
        }
    }
}

impl Drop for OperationQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Forwards bus events to the observers up to `QueueShutdown`, then closes them.
fn observer_listener(bus: &Bus, observers: ObserverSet) {
    if observers.is_empty() {
        return;
    }
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    observers.emit(&ev);
                    if ev.kind == EventKind::QueueShutdown {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        observers.close().await;
    });
}

/// Starts operations in submission order, at most one per available permit.
async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<OperationId>,
    registry: Arc<Registry>,
    semaphore: Option<Arc<Semaphore>>,
    bus: Bus,
    token: CancellationToken,
) {
    loop {
        let id = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = rx.recv() => match next {
                Some(id) => id,
                None => break,
            },
        };

        let permit = match &semaphore {
            None => None,
            Some(sem) => tokio::select! {
                biased;
                _ = token.cancelled() => break,
                permit = Arc::clone(sem).acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(_closed) => break,
                },
            },
        };

        // Cancelled while waiting for its turn.
        let Some(op) = registry.get(id) else { continue };

        let (registry, bus, token) = (Arc::clone(&registry), bus.clone(), token.clone());
        tokio::spawn(async move {
            runner::run_once(&op, id, &token, &bus).await;
            drop(permit);
            if registry.take(id).is_some() {
                publish_terminal(&bus, &op, id, None);
            }
        });
    }
}

/// Publishes `OperationFinished` or `OperationCancelled`, from the operation's state.
fn publish_terminal(bus: &Bus, op: &OperationRef, id: OperationId, reason: Option<&str>) {
    let kind = match op.state() {
        OperationState::Finished => EventKind::OperationFinished,
        _ => EventKind::OperationCancelled,
    };
    let mut ev = Event::new(kind).with_operation(op.name()).with_id(id);
    if let (EventKind::OperationCancelled, Some(reason)) = (kind, reason) {
        ev = ev.with_reason(reason);
    }
    bus.publish(ev);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;
    use crate::error::CardinalityError;
    use crate::operations::{InOperationQueue, Outcome, SingleOperation};
    use crate::stream::{Completion, Just, Never, Publisher, Subject, SubscriberRef};
    use crate::testing::{Recorded, Recorder, Sequence, eventually};
    use crate::traits::{Assert, Checked, MaybePublisher, Single, SinglePublisher};

    fn completion<P>(op: &SingleOperation<P>) -> oneshot::Receiver<Outcome<u32, String>>
    where
        P: SinglePublisher<Output = u32, Failure = String>,
    {
        let (tx, rx) = oneshot::channel();
        op.observe_completion(move |o| {
            let _ = tx.send(o);
        })
        .expect("first observer");
        rx
    }

    async fn next_kinds(rx: &mut broadcast::Receiver<Event>, n: usize) -> Vec<EventKind> {
        let mut kinds = Vec::with_capacity(n);
        while kinds.len() < n {
            let ev = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("event in time")
                .expect("bus open");
            kinds.push(ev.kind);
        }
        kinds
    }

    /// Single publisher whose subscribe panics.
    struct Exploding;

    impl Publisher for Exploding {
        type Output = u32;
        type Failure = String;

        fn subscribe(&self, _subscriber: SubscriberRef<u32, String>) {
            panic!("subscribe exploded");
        }
    }

    impl MaybePublisher for Exploding {}
    impl SinglePublisher for Exploding {}

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runs_operation_and_reports_events() {
        let queue = OperationQueue::new(QueueConfig::default());
        let mut events = queue.events();

        let op = SingleOperation::named("answer", Just::<u32, String>::new(42));
        let done = completion(&op);
        let id = queue.submit(op.clone());

        assert_eq!(done.await.expect("outcome"), Outcome::Completed(Ok(42)));
        assert_eq!(
            next_kinds(&mut events, 3).await,
            vec![
                EventKind::OperationEnqueued,
                EventKind::OperationStarting,
                EventKind::OperationFinished
            ]
        );
        eventually(|| queue.is_empty()).await;
        assert_eq!(id, OperationId::new(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn serial_queue_holds_the_slot_until_the_operation_terminates() {
        let queue = OperationQueue::new(QueueConfig::serial());
        let subject = Subject::<u32, String>::new();

        let first = SingleOperation::new(Assert::<_, Single>::new(subject.clone()));
        let second = SingleOperation::new(Just::<u32, String>::new(2));
        let second_done = completion(&second);
        queue.submit(first.clone());
        queue.submit(second.clone());

        eventually(|| subject.subscriber_count() == 1).await;
        assert_eq!(first.state(), OperationState::Executing);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(second.state(), OperationState::Ready);
        assert_eq!(queue.len(), 2);

        subject.send(1);
        subject.send_completion(Completion::Finished);

        assert_eq!(
            second_done.await.expect("outcome"),
            Outcome::Completed(Ok(2))
        );
        assert_eq!(first.state(), OperationState::Finished);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_before_its_turn_is_never_run() {
        let queue = OperationQueue::new(QueueConfig::serial());
        let blocker = Subject::<u32, String>::new();
        let upstream = Sequence::<u32, String>::new(vec![1]);

        let first = SingleOperation::new(Assert::<_, Single>::new(blocker.clone()));
        let second = SingleOperation::new(Assert::<_, Single>::new(upstream.clone()));
        let second_done = completion(&second);
        queue.submit(first.clone());
        let id = queue.submit(second.clone());

        eventually(|| blocker.subscriber_count() == 1).await;
        queue.cancel(id);
        assert_eq!(queue.list(), vec![OperationId::new(1)]);

        blocker.send_completion(Completion::Failure("released".into()));
        eventually(|| queue.is_empty()).await;

        assert_eq!(second_done.await.expect("outcome"), Outcome::Cancelled);
        assert_eq!(upstream.subscription_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_run_cancels_the_operation() {
        let queue = OperationQueue::new(QueueConfig::default());
        let mut events = queue.events();

        let op = SingleOperation::named("exploding", Exploding);
        let done = completion(&op);
        queue.submit(op.clone());

        assert_eq!(done.await.expect("outcome"), Outcome::Cancelled);
        assert_eq!(
            next_kinds(&mut events, 4).await,
            vec![
                EventKind::OperationEnqueued,
                EventKind::OperationStarting,
                EventKind::OperationPanicked,
                EventKind::OperationCancelled
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_cancels_everything_and_rejects_new_work() {
        let queue = OperationQueue::new(QueueConfig::serial());
        let subject = Subject::<u32, String>::new();

        let running = SingleOperation::new(Assert::<_, Single>::new(subject.clone()));
        let waiting = SingleOperation::new(Just::<u32, String>::new(1));
        let running_done = completion(&running);
        let waiting_done = completion(&waiting);
        queue.submit(running.clone());
        queue.submit(waiting.clone());
        eventually(|| subject.subscriber_count() == 1).await;

        queue.shutdown();
        assert!(queue.is_shut_down());
        assert!(queue.is_empty());
        assert_eq!(running_done.await.expect("outcome"), Outcome::Cancelled);
        assert_eq!(waiting_done.await.expect("outcome"), Outcome::Cancelled);
        assert_eq!(subject.cancellation_count(), 1);

        let late = SingleOperation::new(Just::<u32, String>::new(3));
        queue.submit(late.clone());
        assert!(late.is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn single_checked_value_through_one_worker() {
        let queue = OperationQueue::new(QueueConfig::serial());
        let upstream = Sequence::<u32, String>::new(vec![1]);
        let publisher =
            InOperationQueue::new(Checked::<_, Single>::new(upstream.clone()), queue.clone());

        let recorder = Recorder::<u32, CardinalityError<String>>::unlimited();
        publisher.subscribe(recorder.clone());

        eventually(|| recorder.events().len() == 2).await;
        assert_eq!(
            recorder.events(),
            vec![Recorded::Value(1), Recorded::Finished]
        );
        assert_eq!(upstream.subscription_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn single_checked_two_values_fail_through_one_worker() {
        let queue = OperationQueue::new(QueueConfig::serial());
        let upstream = Sequence::<u32, String>::new(vec![1, 2]);
        let publisher =
            InOperationQueue::new(Checked::<_, Single>::new(upstream.clone()), queue.clone());

        let recorder = Recorder::<u32, CardinalityError<String>>::unlimited();
        publisher.subscribe(recorder.clone());

        eventually(|| !recorder.events().is_empty()).await;
        assert_eq!(
            recorder.events(),
            vec![Recorded::Failure(CardinalityError::TooManyValues)]
        );
        assert!(recorder.values().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn downstream_cancel_reaches_the_queue() {
        let queue = OperationQueue::new(QueueConfig::serial());
        let subject = Subject::<u32, String>::new();
        let publisher =
            InOperationQueue::new(Assert::<_, Single>::new(subject.clone()), queue.clone());

        let recorder = Recorder::<u32, String>::unlimited();
        publisher.subscribe(recorder.clone());
        eventually(|| subject.subscriber_count() == 1).await;

        recorder.cancel();
        eventually(|| queue.is_empty()).await;
        assert_eq!(subject.cancellation_count(), 1);
        assert!(recorder.events().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn upstream_failure_racing_downstream_cancel_yields_one_outcome() {
        use std::sync::Barrier;

        let queue = OperationQueue::new(QueueConfig::serial());
        let (mut failed, mut cancelled) = (0, 0);

        for _ in 0..200 {
            let subject = Subject::<u32, String>::new();
            let publisher =
                InOperationQueue::new(Assert::<_, Single>::new(subject.clone()), queue.clone());
            let recorder = Recorder::<u32, String>::unlimited();
            publisher.subscribe(recorder.clone());
            eventually(|| subject.subscriber_count() == 1).await;

            let barrier = Arc::new(Barrier::new(2));
            let fail = {
                let (barrier, subject) = (Arc::clone(&barrier), subject.clone());
                tokio::task::spawn_blocking(move || {
                    barrier.wait();
                    subject.send_completion(Completion::Failure("boom".into()));
                })
            };
            let cancel = {
                let (barrier, recorder) = (Arc::clone(&barrier), recorder.clone());
                tokio::task::spawn_blocking(move || {
                    barrier.wait();
                    recorder.cancel();
                })
            };
            fail.await.expect("failing side");
            cancel.await.expect("cancelling side");

            match recorder.events().as_slice() {
                [] => cancelled += 1,
                [Recorded::Failure(e)] if e == "boom" => failed += 1,
                other => panic!("unexpected events {other:?}"),
            }
            eventually(|| queue.is_empty()).await;
        }
        assert_eq!(failed + cancelled, 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn observers_see_shutdown_last_and_are_released() {
        use async_trait::async_trait;

        use crate::observers::Observe;

        #[derive(Default)]
        struct Collect(parking_lot::Mutex<Vec<EventKind>>);

        #[async_trait]
        impl Observe for Collect {
            async fn on_event(&self, event: &Event) {
                self.0.lock().push(event.kind);
            }
        }

        let collect = Arc::new(Collect::default());
        let queue = OperationQueue::builder(QueueConfig::serial())
            .with_observers(vec![collect.clone()])
            .build();

        let done = SingleOperation::new(Just::<u32, String>::new(1));
        let done_rx = completion(&done);
        queue.submit(done);
        done_rx.await.expect("outcome");
        eventually(|| queue.is_empty()).await;

        queue.submit(SingleOperation::new(Never::<u32, String>::new()));
        queue.shutdown();

        // The lane task holds the only other reference until it is closed.
        eventually(|| Arc::strong_count(&collect) == 1).await;
        let kinds = collect.0.lock().clone();
        assert_eq!(
            kinds[..4],
            [
                EventKind::OperationEnqueued,
                EventKind::OperationStarting,
                EventKind::OperationFinished,
                EventKind::OperationEnqueued,
            ]
        );
        // The second operation may or may not have started before shutdown.
        assert_eq!(
            kinds[kinds.len() - 2..],
            [EventKind::OperationCancelled, EventKind::QueueShutdown]
        );
    }

    #[tokio::test]
    async fn operation_names_reach_events() {
        let queue = OperationQueue::new(QueueConfig::default());
        let mut events = queue.events();
        let op: OperationRef = SingleOperation::named("named", Just::<u32, String>::new(0));
        let id = queue.submit(op);

        let ev = events.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::OperationEnqueued);
        assert_eq!(ev.operation.as_deref(), Some("named"));
        assert_eq!(ev.id, Some(id));
    }
}
