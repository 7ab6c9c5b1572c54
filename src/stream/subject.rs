//! # Subject: a manually driven publisher.
//!
//! [`Subject`] broadcasts whatever is passed to [`send`](Subject::send) to its current
//! subscribers, honoring each subscriber's outstanding demand (values arriving while a
//! subscriber has no demand are dropped for that subscriber). After
//! [`send_completion`](Subject::send_completion) every current and future subscriber
//! receives the same terminal signal.
//!
//! The subject counts subscriptions and cancellations, which makes it convenient for
//! checking that an upstream was (or was not) subscribed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::protocol::{
    Completion, Demand, Inert, Publisher, SubscriberRef, Subscription,
};

struct Link<T, E> {
    downstream: SubscriberRef<T, E>,
    demand: Mutex<Demand>,
    cancelled: AtomicBool,
    shared: Weak<Shared<T, E>>,
}

struct State<T, E> {
    links: Vec<Arc<Link<T, E>>>,
    completion: Option<Completion<E>>,
    subscriptions: usize,
    cancellations: usize,
}

struct Shared<T, E> {
    state: Mutex<State<T, E>>,
}

/// Publisher fed by hand.
pub struct Subject<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Subject<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Default for Subject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Subject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a subject with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    links: Vec::new(),
                    completion: None,
                    subscriptions: 0,
                    cancellations: 0,
                }),
            }),
        }
    }

    /// Pushes `value` to every subscriber that has outstanding demand.
    ///
    /// Ignored once the subject completed.
    pub fn send(&self, value: T) {
        let links = {
            let state = self.shared.state.lock();
            if state.completion.is_some() {
                return;
            }
            state.links.clone()
        };

        for link in links {
            if link.cancelled.load(Ordering::Acquire) || !link.demand.lock().take_one() {
                continue;
            }
            let extra = link.downstream.on_value(value.clone());
            if !extra.is_none() {
                let mut demand = link.demand.lock();
                *demand = demand.saturating_add(extra);
            }
        }
    }

    /// Terminates every subscriber. Later calls are ignored.
    pub fn send_completion(&self, completion: Completion<E>) {
        let links = {
            let mut state = self.shared.state.lock();
            if state.completion.is_some() {
                return;
            }
            state.completion = Some(completion.clone());
            std::mem::take(&mut state.links)
        };

        for link in links {
            if link.cancelled.swap(true, Ordering::AcqRel) {
                continue;
            }
            link.downstream.on_completion(completion.clone());
        }
    }

    /// Total number of `subscribe` calls so far.
    pub fn subscription_count(&self) -> usize {
        self.shared.state.lock().subscriptions
    }

    /// Number of subscriptions cancelled by their subscriber.
    pub fn cancellation_count(&self) -> usize {
        self.shared.state.lock().cancellations
    }

    /// Number of subscribers still attached.
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().links.len()
    }
}

impl<T, E> Publisher for Subject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe(&self, subscriber: SubscriberRef<T, E>) {
        let (link, completion) = {
            let mut state = self.shared.state.lock();
            state.subscriptions += 1;
            match &state.completion {
                Some(c) => (None, Some(c.clone())),
                None => {
                    let link = Arc::new(Link {
                        downstream: Arc::clone(&subscriber),
                        demand: Mutex::new(Demand::NONE),
                        cancelled: AtomicBool::new(false),
                        shared: Arc::downgrade(&self.shared),
                    });
                    state.links.push(Arc::clone(&link));
                    (Some(link), None)
                }
            }
        };

        match (link, completion) {
            (Some(link), _) => subscriber.on_subscribe(link),
            (None, Some(c)) => {
                subscriber.on_subscribe(Arc::new(Inert));
                subscriber.on_completion(c);
            }
            (None, None) => {}
        }
    }
}

impl<T, E> Subscription for Link<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn request(&self, demand: Demand) {
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }
        let mut current = self.demand.lock();
        *current = current.saturating_add(demand);
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            let mut state = shared.state.lock();
            state.cancellations += 1;
            state
                .links
                .retain(|l| !std::ptr::eq(Arc::as_ptr(l), self as *const Self));
        }
    }
}
