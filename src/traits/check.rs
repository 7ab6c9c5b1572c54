//! # Runtime verification of a cardinality promise.
//!
//! [`Checked`] wraps any publisher and, per subscription, watches what the upstream
//! actually emits. The single value (if any) is held back until the upstream
//! terminates, because only termination proves the promise.
//!
//! ## Decision table
//! ```text
//!                    NoValueYet                      HaveValue(v)
//! value w            buffer w                        fail TooManyValues, cancel upstream
//! Finished           Maybe: Finished                 forward v, Finished
//!                    Single: fail NoValue
//! Failure(e)         fail UpstreamFailure(e)         fail ValueAndFailure
//! ```
//!
//! ## Rules
//! - Upstream is asked for values only after the subscriber requested at least one;
//!   it is then asked for `Unlimited` so that a second value can be observed.
//! - A value that is never followed by a termination is never forwarded.
//! - Exactly one terminal signal reaches the subscriber; after it (or after cancel)
//!   nothing else does.

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{Cardinality, CardinalityKind, Maybe, MaybePublisher, Single, SinglePublisher};
use crate::error::CardinalityError;
use crate::stream::{
    Completion, Demand, Publisher, Subscriber, SubscriberRef, Subscription, SubscriptionRef,
};

/// Publisher verifying that `P` keeps the promise selected by `K`.
pub struct Checked<P, K> {
    upstream: P,
    kind: PhantomData<K>,
}

impl<P: Clone, K> Clone for Checked<P, K> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            kind: PhantomData,
        }
    }
}

impl<P: Publisher, K: CardinalityKind> Checked<P, K> {
    /// Wraps `upstream`.
    pub fn new(upstream: P) -> Self {
        Self {
            upstream,
            kind: PhantomData,
        }
    }

    /// The promise being verified.
    pub fn cardinality(&self) -> Cardinality {
        K::CARDINALITY
    }

    /// Returns the wrapped publisher.
    pub fn into_inner(self) -> P {
        self.upstream
    }
}

impl<P: Publisher, K: CardinalityKind> Publisher for Checked<P, K> {
    type Output = P::Output;
    type Failure = CardinalityError<P::Failure>;

    fn subscribe(&self, subscriber: SubscriberRef<Self::Output, Self::Failure>) {
        let check = Arc::new_cyclic(|me| CheckSubscription {
            cardinality: K::CARDINALITY,
            me: me.clone(),
            inner: Mutex::new(CheckInner {
                context: Context::NoValueYet,
                upstream: None,
                downstream: Some(subscriber),
                requested: false,
                done: false,
                delivering: false,
            }),
        });
        self.upstream.subscribe(check);
    }
}

impl<P: Publisher> MaybePublisher for Checked<P, Maybe> {}
impl<P: Publisher> MaybePublisher for Checked<P, Single> {}
impl<P: Publisher> SinglePublisher for Checked<P, Single> {}

/// What the upstream emitted so far.
enum Context<T> {
    NoValueYet,
    HaveValue(T),
    Completed,
    Failed,
}

struct CheckInner<T, E> {
    context: Context<T>,
    upstream: Option<SubscriptionRef>,
    downstream: Option<SubscriberRef<T, CardinalityError<E>>>,
    requested: bool,
    done: bool,
    /// The held value is out; `Finished` follows unless cancelled meanwhile.
    delivering: bool,
}

/// Upstream subscriber and downstream subscription at once.
struct CheckSubscription<T, E> {
    cardinality: Cardinality,
    me: Weak<Self>,
    inner: Mutex<CheckInner<T, E>>,
}

/// What to do once the lock is released.
enum Action<T, E> {
    Nothing,
    Fail(CardinalityError<E>),
    Finish(Option<T>),
}

impl<T, E> CheckSubscription<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Applies `action` to the downstream taken out of `inner`.
    fn perform(
        &self,
        downstream: Option<SubscriberRef<T, CardinalityError<E>>>,
        action: Action<T, E>,
    ) {
        let Some(downstream) = downstream else { return };
        match action {
            Action::Nothing => {}
            Action::Fail(e) => downstream.on_completion(Completion::Failure(e)),
            Action::Finish(None) => downstream.on_completion(Completion::Finished),
            Action::Finish(Some(v)) => {
                let _ = downstream.on_value(v);
                // The subscriber may have cancelled from inside `on_value`.
                let finished = {
                    let mut inner = self.inner.lock();
                    if std::mem::take(&mut inner.delivering) {
                        inner.downstream.take()
                    } else {
                        None
                    }
                };
                if let Some(downstream) = finished {
                    downstream.on_completion(Completion::Finished);
                }
            }
        }
    }
}

impl<T, E> Subscriber<T, E> for CheckSubscription<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn on_subscribe(&self, subscription: SubscriptionRef) {
        let downstream = {
            let mut inner = self.inner.lock();
            if inner.done || inner.upstream.is_some() {
                drop(inner);
                subscription.cancel();
                return;
            }
            inner.upstream = Some(subscription);
            inner.downstream.clone()
        };

        if let (Some(downstream), Some(me)) = (downstream, self.me.upgrade()) {
            downstream.on_subscribe(me);
        }
    }

    fn on_value(&self, value: T) -> Demand {
        let (upstream, downstream) = {
            let mut inner = self.inner.lock();
            if inner.done {
                return Demand::NONE;
            }
            match std::mem::replace(&mut inner.context, Context::Failed) {
                Context::NoValueYet => {
                    inner.context = Context::HaveValue(value);
                    return Demand::NONE;
                }
                Context::HaveValue(_) => {
                    inner.done = true;
                    (inner.upstream.take(), inner.downstream.take())
                }
                other => {
                    inner.context = other;
                    return Demand::NONE;
                }
            }
        };

        if let Some(upstream) = upstream {
            upstream.cancel();
        }
        self.perform(downstream, Action::Fail(CardinalityError::TooManyValues));
        Demand::NONE
    }

    fn on_completion(&self, completion: Completion<E>) {
        let (downstream, action) = {
            let mut inner = self.inner.lock();
            if inner.done {
                return;
            }
            inner.done = true;
            inner.upstream = None;

            let action = match (
                std::mem::replace(&mut inner.context, Context::Completed),
                completion,
            ) {
                (Context::NoValueYet, Completion::Finished) => {
                    if self.cardinality.allows_empty() {
                        Action::Finish(None)
                    } else {
                        inner.context = Context::Failed;
                        Action::Fail(CardinalityError::NoValue)
                    }
                }
                (Context::HaveValue(v), Completion::Finished) => Action::Finish(Some(v)),
                (Context::NoValueYet, Completion::Failure(e)) => {
                    inner.context = Context::Failed;
                    Action::Fail(CardinalityError::UpstreamFailure(e))
                }
                (Context::HaveValue(_), Completion::Failure(_)) => {
                    inner.context = Context::Failed;
                    Action::Fail(CardinalityError::ValueAndFailure)
                }
                (other, _) => {
                    inner.context = other;
                    Action::Nothing
                }
            };
            let downstream = if matches!(action, Action::Finish(Some(_))) {
                inner.delivering = true;
                inner.downstream.clone()
            } else {
                inner.downstream.take()
            };
            (downstream, action)
        };

        self.perform(downstream, action);
    }
}

impl<T, E> Subscription for CheckSubscription<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn request(&self, demand: Demand) {
        if demand.is_none() {
            return;
        }
        let upstream = {
            let mut inner = self.inner.lock();
            if inner.done || inner.requested {
                return;
            }
            inner.requested = true;
            inner.upstream.clone()
        };
        if let Some(upstream) = upstream {
            upstream.request(Demand::Unlimited);
        }
    }

    fn cancel(&self) {
        let (upstream, downstream) = {
            let mut inner = self.inner.lock();
            if std::mem::take(&mut inner.delivering) {
                (None, inner.downstream.take())
            } else if inner.done {
                return;
            } else {
                inner.done = true;
                inner.context = Context::Failed;
                (inner.upstream.take(), inner.downstream.take())
            }
        };
        drop(downstream);
        if let Some(upstream) = upstream {
            upstream.cancel();
        }
    }
}
