//! # SingleOperation: a single-result publisher as a cancellable operation.
//!
//! [`SingleOperation`] wraps a [`SinglePublisher`] and subscribes to it only when an
//! executor calls [`run`](SingleOperation::run). The single result (or the
//! cancellation) is reported once to the completion observer.
//!
//! ## Ownership
//! ```text
//! SingleOperation ──owns──► upstream publisher        (until run() or cancel())
//!                 ──owns──► upstream subscription     (only while Executing)
//!                 ──owns──► completion observer       (until it fires)
//! OperationSink   ──weak──► SingleOperation
//! ```
//!
//! ## Rules
//! - Every transition happens under one lock; the terminal one (`Finished` or
//!   `Cancelled`) is taken by exactly one caller. A result racing a cancel is
//!   dropped if the cancel got the lock first, and vice versa.
//! - The observer fires exactly once, with the lock released.
//! - Cancelling before `run` means the upstream is never subscribed.
//! - Dropping an `Executing` operation cancels its upstream subscription.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::operation::{Operation, OperationState, Outcome};
use crate::error::OperationError;
use crate::stream::{Completion, Demand, Subscriber, SubscriptionRef};
use crate::traits::SinglePublisher;

type Observer<T, E> = Box<dyn FnOnce(Outcome<T, E>) + Send>;

struct Inner<P: SinglePublisher> {
    state: OperationState,
    upstream: Option<P>,
    subscription: Option<SubscriptionRef>,
    /// Terminal outcome waiting for an observer.
    outcome: Option<Outcome<P::Output, P::Failure>>,
    observer: Option<Observer<P::Output, P::Failure>>,
    observed: bool,
}

/// Operation running one [`SinglePublisher`] to completion.
pub struct SingleOperation<P: SinglePublisher> {
    name: Arc<str>,
    inner: Mutex<Inner<P>>,
    terminated: CancellationToken,
    me: Weak<Self>,
}

impl<P: SinglePublisher> SingleOperation<P> {
    /// Wraps `upstream` in a `Pending` operation. Nothing is subscribed yet.
    pub fn new(upstream: P) -> Arc<Self> {
        Self::named("single", upstream)
    }

    /// Like [`new`](Self::new), with a name for logs and events.
    pub fn named(name: impl Into<Arc<str>>, upstream: P) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|me| Self {
            name,
            inner: Mutex::new(Inner {
                state: OperationState::Pending,
                upstream: Some(upstream),
                subscription: None,
                outcome: None,
                observer: None,
                observed: false,
            }),
            terminated: CancellationToken::new(),
            me: me.clone(),
        })
    }

    /// Operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> OperationState {
        self.inner.lock().state
    }

    /// Returns true once cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state() == OperationState::Cancelled
    }

    /// Token cancelled on the terminal transition.
    pub fn terminated(&self) -> CancellationToken {
        self.terminated.clone()
    }

    /// `Pending → Ready`. Ignored in any other state.
    pub fn enqueue(&self) {
        let mut inner = self.inner.lock();
        if inner.state == OperationState::Pending {
            inner.state = OperationState::Ready;
        }
    }

    /// Subscribes to the upstream on the calling thread.
    ///
    /// Returns immediately if the operation was cancelled or has already run. The
    /// result may arrive before this returns or later on another thread.
    ///
    /// # Panics
    /// If the operation is runnable but holds no upstream. This cannot happen through
    /// the public API.
    pub fn run(&self) {
        let upstream = {
            let mut inner = self.inner.lock();
            if !matches!(
                inner.state,
                OperationState::Pending | OperationState::Ready
            ) {
                return;
            }
            let Some(upstream) = inner.upstream.take() else {
                panic!("operation {:?} is runnable without an upstream", self.name);
            };
            inner.state = OperationState::Executing;
            upstream
        };

        upstream.subscribe(Arc::new(OperationSink {
            operation: self.me.clone(),
            value: Mutex::new(None),
        }));
    }

    /// Cancels the operation.
    ///
    /// `Pending | Ready`: the upstream is dropped unsubscribed. `Executing`: the live
    /// upstream subscription is cancelled. Terminal states are left untouched.
    pub fn cancel(&self) {
        let (observer, subscription, upstream) = {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                return;
            }
            inner.state = OperationState::Cancelled;
            let observer = inner.observer.take();
            if observer.is_none() {
                inner.outcome = Some(Outcome::Cancelled);
            }
            (observer, inner.subscription.take(), inner.upstream.take())
        };

        if let Some(subscription) = subscription {
            subscription.cancel();
        }
        drop(upstream);
        self.terminated.cancel();
        if let Some(observer) = observer {
            observer(Outcome::Cancelled);
        }
    }

    /// Registers the one-shot completion observer.
    ///
    /// `observer` runs exactly once: with [`Outcome::Completed`] when the upstream
    /// delivers, or with [`Outcome::Cancelled`]. If the operation is already terminal,
    /// it runs right away on the calling thread.
    ///
    /// # Errors
    /// [`OperationError::ObserverAlreadyRegistered`] if an observer was registered
    /// before; `observer` is dropped without being called.
    pub fn observe_completion<F>(&self, observer: F) -> Result<(), OperationError>
    where
        F: FnOnce(Outcome<P::Output, P::Failure>) + Send + 'static,
    {
        let outcome = {
            let mut inner = self.inner.lock();
            if inner.observed {
                return Err(OperationError::ObserverAlreadyRegistered {
                    operation: self.name.to_string(),
                });
            }
            inner.observed = true;
            match inner.outcome.take() {
                Some(outcome) => outcome,
                None => {
                    inner.observer = Some(Box::new(observer));
                    return Ok(());
                }
            }
        };
        observer(outcome);
        Ok(())
    }

    /// Keeps the upstream subscription, unless a terminal state was reached meanwhile.
    fn attach(&self, subscription: &SubscriptionRef) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != OperationState::Executing {
            return false;
        }
        inner.subscription = Some(Arc::clone(subscription));
        true
    }

    fn finish(&self, result: Result<P::Output, P::Failure>) {
        let (observer, subscription) = {
            let mut inner = self.inner.lock();
            if inner.state != OperationState::Executing {
                return;
            }
            inner.state = OperationState::Finished;
            let observer = match inner.observer.take() {
                Some(observer) => Some((observer, result)),
                None => {
                    inner.outcome = Some(Outcome::Completed(result));
                    None
                }
            };
            (observer, inner.subscription.take())
        };

        drop(subscription);
        self.terminated.cancel();
        if let Some((observer, result)) = observer {
            observer(Outcome::Completed(result));
        }
    }
}

impl<P: SinglePublisher> Operation for SingleOperation<P> {
    fn name(&self) -> &str {
        SingleOperation::name(self)
    }

    fn state(&self) -> OperationState {
        SingleOperation::state(self)
    }

    fn enqueue(&self) {
        SingleOperation::enqueue(self)
    }

    fn run(&self) {
        SingleOperation::run(self)
    }

    fn cancel(&self) {
        SingleOperation::cancel(self)
    }

    fn terminated(&self) -> CancellationToken {
        SingleOperation::terminated(self)
    }
}

impl<P: SinglePublisher> Drop for SingleOperation<P> {
    /// Releases a live upstream subscription; the sink only holds a `Weak` back.
    fn drop(&mut self) {
        if let Some(subscription) = self.inner.get_mut().subscription.take() {
            subscription.cancel();
        }
    }
}

/// Upstream subscriber recording the single value.
struct OperationSink<P: SinglePublisher> {
    operation: Weak<SingleOperation<P>>,
    value: Mutex<Option<P::Output>>,
}

impl<P: SinglePublisher> Subscriber<P::Output, P::Failure> for OperationSink<P> {
    fn on_subscribe(&self, subscription: SubscriptionRef) {
        let attached = self
            .operation
            .upgrade()
            .is_some_and(|op| op.attach(&subscription));
        if attached {
            subscription.request(Demand::Unlimited);
        } else {
            subscription.cancel();
        }
    }

    fn on_value(&self, value: P::Output) -> Demand {
        let mut slot = self.value.lock();
        debug_assert!(slot.is_none(), "single publisher emitted a second value");
        if slot.is_none() {
            *slot = Some(value);
        }
        Demand::NONE
    }

    fn on_completion(&self, completion: Completion<P::Failure>) {
        let Some(operation) = self.operation.upgrade() else { return };
        match completion {
            Completion::Failure(e) => operation.finish(Err(e)),
            Completion::Finished => match self.value.lock().take() {
                Some(value) => operation.finish(Ok(value)),
                None => {
                    debug_assert!(false, "single publisher finished without a value");
                    operation.cancel();
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    use super::*;
    use crate::stream::{Fail, Just, Never, Subject};
    use crate::testing::Sequence;
    use crate::traits::{Assert, Single};

    type Seen = Arc<Mutex<Vec<Outcome<u32, String>>>>;

    fn observe<P>(op: &SingleOperation<P>) -> Seen
    where
        P: SinglePublisher<Output = u32, Failure = String>,
    {
        let seen: Seen = Arc::default();
        let sink = Arc::clone(&seen);
        op.observe_completion(move |o| sink.lock().push(o))
            .expect("first observer");
        seen
    }

    #[test]
    fn run_delivers_result_once() {
        let op = SingleOperation::new(Just::<u32, String>::new(9));
        let seen = observe(&op);
        assert_eq!(op.state(), OperationState::Pending);

        op.enqueue();
        assert_eq!(op.state(), OperationState::Ready);
        op.run();
        op.run();

        assert_eq!(op.state(), OperationState::Finished);
        assert!(op.terminated().is_cancelled());
        assert_eq!(*seen.lock(), vec![Outcome::Completed(Ok(9))]);
    }

    #[test]
    fn failure_is_a_result_not_a_cancellation() {
        let op = SingleOperation::new(Fail::<u32, String>::new("bad".into()));
        let seen = observe(&op);
        op.run();
        assert_eq!(*seen.lock(), vec![Outcome::Completed(Err("bad".into()))]);
    }

    #[test]
    fn cancel_before_run_never_subscribes() {
        let upstream = Sequence::<u32, String>::new(vec![1]);
        let op = SingleOperation::new(Assert::<_, Single>::new(upstream.clone()));
        let seen = observe(&op);

        op.enqueue();
        op.cancel();
        op.run();

        assert_eq!(upstream.subscription_count(), 0);
        assert_eq!(op.state(), OperationState::Cancelled);
        assert_eq!(*seen.lock(), vec![Outcome::Cancelled]);
    }

    #[test]
    fn cancel_while_executing_cancels_upstream() {
        let subject = Subject::<u32, String>::new();
        let op = SingleOperation::new(Assert::<_, Single>::new(subject.clone()));
        let seen = observe(&op);

        op.run();
        assert_eq!(op.state(), OperationState::Executing);
        assert!(!op.terminated().is_cancelled());

        op.cancel();
        subject.send(1);
        subject.send_completion(Completion::Finished);

        assert_eq!(subject.cancellation_count(), 1);
        assert_eq!(*seen.lock(), vec![Outcome::Cancelled]);
    }

    #[test]
    fn dropping_an_executing_operation_cancels_upstream() {
        let subject = Subject::<u32, String>::new();
        let op = SingleOperation::new(Assert::<_, Single>::new(subject.clone()));
        op.run();
        assert_eq!(subject.subscriber_count(), 1);

        drop(op);
        assert_eq!(subject.cancellation_count(), 1);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn cancel_after_finish_is_a_no_op() {
        let op = SingleOperation::new(Just::<u32, String>::new(1));
        let seen = observe(&op);
        op.run();
        op.cancel();
        assert_eq!(op.state(), OperationState::Finished);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn late_observer_fires_immediately() {
        let op = SingleOperation::new(Just::<u32, String>::new(2));
        op.run();
        let seen = observe(&op);
        assert_eq!(*seen.lock(), vec![Outcome::Completed(Ok(2))]);
    }

    #[test]
    fn second_observer_is_rejected() {
        let op = SingleOperation::named("twice", Never::<u32, String>::new());
        let _seen = observe(&op);
        let err = op.observe_completion(|_| {}).unwrap_err();
        assert_eq!(
            err,
            OperationError::ObserverAlreadyRegistered {
                operation: "twice".into()
            }
        );
    }

    #[test]
    fn never_terminating_upstream_stays_executing() {
        let op = SingleOperation::new(Never::<u32, String>::new());
        op.run();
        assert_eq!(op.state(), OperationState::Executing);
        op.cancel();
        assert!(op.is_cancelled());
    }

    #[test]
    fn cancel_racing_delivery_fires_exactly_one_callback() {
        for _ in 0..500 {
            let subject = Subject::<u32, String>::new();
            let op = SingleOperation::new(Assert::<_, Single>::new(subject.clone()));
            let calls = Arc::new(AtomicUsize::new(0));
            let seen = Arc::new(Mutex::new(None));
            {
                let (calls, seen) = (Arc::clone(&calls), Arc::clone(&seen));
                op.observe_completion(move |o| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    *seen.lock() = Some(o);
                })
                .expect("first observer");
            }
            op.run();

            let barrier = Barrier::new(2);
            std::thread::scope(|s| {
                s.spawn(|| {
                    barrier.wait();
                    subject.send(7);
                    subject.send_completion(Completion::Finished);
                });
                s.spawn(|| {
                    barrier.wait();
                    op.cancel();
                });
            });

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            let outcome = seen.lock().take().expect("observer fired");
            match outcome {
                Outcome::Completed(r) => {
                    assert_eq!(r, Ok(7));
                    assert_eq!(op.state(), OperationState::Finished);
                }
                Outcome::Cancelled => assert_eq!(op.state(), OperationState::Cancelled),
            }
        }
    }
}
