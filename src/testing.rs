//! Test helpers shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::stream::{
    Completion, Demand, Publisher, Subscriber, SubscriberRef, Subscription, SubscriptionRef,
};

/// One observed protocol event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Recorded<T, E> {
    Value(T),
    Finished,
    Failure(E),
}

/// Subscriber recording everything it receives.
pub(crate) struct Recorder<T, E> {
    initial: Demand,
    cancel_on_value: bool,
    subscription: Mutex<Option<SubscriptionRef>>,
    events: Mutex<Vec<Recorded<T, E>>>,
}

impl<T, E> Recorder<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn with_demand(initial: Demand) -> Arc<Self> {
        Arc::new(Self {
            initial,
            cancel_on_value: false,
            subscription: Mutex::new(None),
            events: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn unlimited() -> Arc<Self> {
        Self::with_demand(Demand::Unlimited)
    }

    /// Requests one value and cancels from inside `on_value` when it arrives.
    pub(crate) fn cancelling_on_value() -> Arc<Self> {
        Arc::new(Self {
            initial: Demand::Max(1),
            cancel_on_value: true,
            subscription: Mutex::new(None),
            events: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn events(&self) -> Vec<Recorded<T, E>> {
        self.events.lock().clone()
    }

    pub(crate) fn values(&self) -> Vec<T> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Recorded::Value(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    pub(crate) fn request(&self, demand: Demand) {
        let subscription = self.subscription.lock().clone();
        if let Some(s) = subscription {
            s.request(demand);
        }
    }

    pub(crate) fn cancel(&self) {
        let subscription = self.subscription.lock().clone();
        if let Some(s) = subscription {
            s.cancel();
        }
    }
}

impl<T, E> Subscriber<T, E> for Recorder<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn on_subscribe(&self, subscription: SubscriptionRef) {
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        if !self.initial.is_none() {
            subscription.request(self.initial);
        }
    }

    fn on_value(&self, value: T) -> Demand {
        self.events.lock().push(Recorded::Value(value));
        if self.cancel_on_value {
            self.cancel();
        }
        Demand::NONE
    }

    fn on_completion(&self, completion: Completion<E>) {
        let event = match completion {
            Completion::Finished => Recorded::Finished,
            Completion::Failure(e) => Recorded::Failure(e),
        };
        self.events.lock().push(event);
    }
}

/// Publisher emitting a fixed list of values on demand, then `Finished`.
///
/// Emission happens synchronously inside `request`, on the requesting thread.
pub(crate) struct Sequence<T, E> {
    values: Vec<T>,
    subscriptions: Arc<AtomicUsize>,
    failure: std::marker::PhantomData<fn() -> E>,
}

impl<T: Clone, E> Clone for Sequence<T, E> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            subscriptions: Arc::clone(&self.subscriptions),
            failure: std::marker::PhantomData,
        }
    }
}

impl<T, E> Sequence<T, E> {
    pub(crate) fn new(values: Vec<T>) -> Self {
        Self {
            values,
            subscriptions: Arc::default(),
            failure: std::marker::PhantomData,
        }
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

impl<T, E> Publisher for Sequence<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe(&self, subscriber: SubscriberRef<T, E>) {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let subscription = Arc::new(SequenceSubscription {
            downstream: Arc::clone(&subscriber),
            state: Mutex::new(SequenceState {
                pending: self.values.iter().cloned().collect(),
                demand: Demand::NONE,
                draining: false,
                done: false,
            }),
        });
        subscriber.on_subscribe(subscription);
    }
}

struct SequenceState<T> {
    pending: VecDeque<T>,
    demand: Demand,
    draining: bool,
    done: bool,
}

struct SequenceSubscription<T, E> {
    downstream: SubscriberRef<T, E>,
    state: Mutex<SequenceState<T>>,
}

enum Step<T> {
    Value(T),
    Finish,
}

impl<T, E> Subscription for SequenceSubscription<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn request(&self, demand: Demand) {
        {
            let mut s = self.state.lock();
            if s.done {
                return;
            }
            s.demand = s.demand.saturating_add(demand);
            if s.draining {
                return;
            }
            s.draining = true;
        }

        loop {
            let step = {
                let mut s = self.state.lock();
                let step = if s.done {
                    None
                } else if s.pending.is_empty() {
                    s.done = true;
                    Some(Step::Finish)
                } else if s.demand.take_one() {
                    s.pending.pop_front().map(Step::Value)
                } else {
                    None
                };
                if step.is_none() {
                    s.draining = false;
                }
                step
            };

            match step {
                None => return,
                Some(Step::Value(v)) => {
                    let extra = self.downstream.on_value(v);
                    let mut s = self.state.lock();
                    s.demand = s.demand.saturating_add(extra);
                }
                Some(Step::Finish) => {
                    self.downstream.on_completion(Completion::Finished);
                    return;
                }
            }
        }
    }

    fn cancel(&self) {
        self.state.lock().done = true;
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub(crate) async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
