//! # Single-consumer subscription base.
//!
//! [`SingleSubscription`] implements the publisher side of the protocol for producers
//! that emit one result to exactly one subscriber and must not start working before
//! the subscriber asks for a value.
//!
//! The concrete producer is a [`SingleProducer`]: it owns its start-up context and
//! provides two hooks, `start` and `did_cancel`. Results come back through the
//! [`Promise`] handed to `start`, possibly much later and from another thread.
//!
//! ## State machine
//! ```text
//!            request(n ≥ 1)              start() returns
//! Waiting ─────────────────► Starting ─────────────────► Running
//!    │                          │  │                        │  │
//!    │ cancel()                 │  │ deliver()     deliver()│  │ cancel()
//!    ▼                          │  ▼                        ▼  ▼
//! Cancelled ◄───── cancel() ────┘ Finished ◄────────── Finished  Cancelled + did_cancel()
//!   (no hooks)     (did_cancel once start returns)
//! ```
//!
//! ## Rules
//! - `start` runs at most once, only after demand `≥ 1`.
//! - `did_cancel` runs at most once, only if `start` ran, and never concurrently with it.
//! - Exactly one terminal signal reaches the subscriber; later deliveries and
//!   deliveries after cancel are swallowed.
//! - A subscriber cancelling from inside `on_value` gets no `Finished`.
//! - Hooks and subscriber callbacks run with the internal lock released.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::stream::{Completion, Demand, SubscriberRef, Subscription};

/// Producer plugged into a [`SingleSubscription`].
///
/// The implementor *is* the start-up context: it is moved into the subscription and
/// handed back by `&mut` to the hooks.
pub trait SingleProducer: Send + Sized + 'static {
    /// Value type.
    type Output: Send + 'static;
    /// Failure type.
    type Failure: Send + 'static;

    /// Starts the work. Called once, after the subscriber requested a value.
    ///
    /// The result must eventually be handed to `promise`, unless the subscription is
    /// cancelled first.
    fn start(&mut self, promise: Promise<Self>);

    /// Tears down whatever `start` set up. Called at most once, after `start`.
    fn did_cancel(&mut self);
}

enum State<P> {
    Waiting(P),
    Starting,
    Running(P),
    /// The value is being handed over; `Finished` follows unless cancelled meanwhile.
    Delivering,
    Finished,
    Cancelled,
}

struct Inner<P: SingleProducer> {
    state: State<P>,
    downstream: Option<SubscriberRef<P::Output, P::Failure>>,
}

/// Subscription delivering the single result of a [`SingleProducer`].
pub struct SingleSubscription<P: SingleProducer> {
    inner: Mutex<Inner<P>>,
    me: Weak<Self>,
}

impl<P: SingleProducer> SingleSubscription<P> {
    /// Creates the subscription and hands it to `downstream`.
    ///
    /// Nothing is started until `downstream` requests demand.
    pub fn attach(producer: P, downstream: SubscriberRef<P::Output, P::Failure>) {
        let subscription = Arc::new_cyclic(|me| Self {
            inner: Mutex::new(Inner {
                state: State::Waiting(producer),
                downstream: Some(Arc::clone(&downstream)),
            }),
            me: me.clone(),
        });
        downstream.on_subscribe(subscription);
    }

    /// Returns true once a result was delivered or the subscription was cancelled.
    pub fn is_terminated(&self) -> bool {
        matches!(
            self.inner.lock().state,
            State::Finished | State::Cancelled
        )
    }

    fn deliver(&self, result: Result<P::Output, P::Failure>) {
        let (downstream, producer) = {
            let mut inner = self.inner.lock();
            let next = if result.is_ok() {
                State::Delivering
            } else {
                State::Finished
            };
            let producer = match std::mem::replace(&mut inner.state, next) {
                State::Running(p) => Some(p),
                State::Starting | State::Waiting(_) => None,
                terminal @ (State::Delivering | State::Finished | State::Cancelled) => {
                    inner.state = terminal;
                    return;
                }
            };
            let downstream = if result.is_ok() {
                inner.downstream.clone()
            } else {
                inner.downstream.take()
            };
            (downstream, producer)
        };
        drop(producer);

        let Some(downstream) = downstream else { return };
        match result {
            Ok(value) => {
                let _ = downstream.on_value(value);
                // The subscriber may have cancelled from inside `on_value`.
                let finished = {
                    let mut inner = self.inner.lock();
                    match inner.state {
                        State::Delivering => {
                            inner.state = State::Finished;
                            inner.downstream.take()
                        }
                        _ => None,
                    }
                };
                if let Some(downstream) = finished {
                    downstream.on_completion(Completion::Finished);
                }
            }
            Err(e) => downstream.on_completion(Completion::Failure(e)),
        }
    }
}

impl<P: SingleProducer> Subscription for SingleSubscription<P> {
    fn request(&self, demand: Demand) {
        if demand.is_none() {
            return;
        }
        let Some(me) = self.me.upgrade() else { return };

        let mut producer = {
            let mut inner = self.inner.lock();
            match std::mem::replace(&mut inner.state, State::Starting) {
                State::Waiting(p) => p,
                other => {
                    inner.state = other;
                    return;
                }
            }
        };

        producer.start(Promise { subscription: me });

        let mut inner = self.inner.lock();
        if matches!(inner.state, State::Starting) {
            inner.state = State::Running(producer);
        } else if matches!(inner.state, State::Cancelled) {
            drop(inner);
            producer.did_cancel();
        }
        // Otherwise the result was delivered from inside `start`.
    }

    fn cancel(&self) {
        let (producer, downstream) = {
            let mut inner = self.inner.lock();
            let producer = match std::mem::replace(&mut inner.state, State::Cancelled) {
                State::Running(p) => Some(p),
                // start() never ran (Waiting) or is still running (Starting).
                State::Waiting(_) | State::Starting | State::Cancelled => None,
                // The value is out; only the pending `Finished` is suppressed.
                State::Delivering => {
                    inner.state = State::Finished;
                    None
                }
                State::Finished => {
                    inner.state = State::Finished;
                    return;
                }
            };
            (producer, inner.downstream.take())
        };
        drop(downstream);
        if let Some(mut producer) = producer {
            producer.did_cancel();
        }
    }
}

/// One-shot handle through which a [`SingleProducer`] reports its result.
pub struct Promise<P: SingleProducer> {
    subscription: Arc<SingleSubscription<P>>,
}

impl<P: SingleProducer> Promise<P> {
    /// Delivers the result downstream: `Ok(v)` as a value followed by `Finished`,
    /// `Err(e)` as `Failure(e)`. Ignored if the subscription already terminated.
    pub fn deliver(self, result: Result<P::Output, P::Failure>) {
        self.subscription.deliver(result);
    }

    /// Cancels the subscription from the producer side; the subscriber receives no
    /// terminal signal.
    pub fn cancel(self) {
        self.subscription.cancel();
    }
}
