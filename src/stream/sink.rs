//! # Closure-based subscribers.
//!
//! A sink requests unlimited demand and hands every signal to user closures. The
//! returned [`Cancellable`] owns the subscription: dropping it cancels, unless it
//! was [`detach`](Cancellable::detach)ed.

use std::sync::Arc;

use parking_lot::Mutex;

use super::protocol::{Completion, Demand, Publisher, Subscriber, SubscriptionRef};

#[derive(Default)]
struct Handle {
    subscription: Option<SubscriptionRef>,
    cancelled: bool,
}

/// Cancels its subscription when dropped.
#[must_use = "dropping a Cancellable cancels the subscription"]
pub struct Cancellable {
    handle: Option<Arc<Mutex<Handle>>>,
}

impl Cancellable {
    /// Cancels the subscription. Idempotent.
    pub fn cancel(&self) {
        let Some(handle) = &self.handle else { return };
        let subscription = {
            let mut h = handle.lock();
            h.cancelled = true;
            h.subscription.take()
        };
        if let Some(s) = subscription {
            s.cancel();
        }
    }

    /// Returns true once [`cancel`](Self::cancel) ran.
    pub fn is_cancelled(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.lock().cancelled)
    }

    /// Lets the subscription run to completion without holding the handle.
    pub fn detach(mut self) {
        self.handle = None;
    }
}

impl Drop for Cancellable {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Cancellable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancellable")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct Sink<V, C> {
    handle: Arc<Mutex<Handle>>,
    on_value: Mutex<V>,
    on_completion: Mutex<Option<C>>,
}

impl<T, E, V, C> Subscriber<T, E> for Sink<V, C>
where
    V: FnMut(T) + Send + 'static,
    C: FnOnce(Completion<E>) + Send + 'static,
{
    fn on_subscribe(&self, subscription: SubscriptionRef) {
        let cancelled = {
            let mut h = self.handle.lock();
            if !h.cancelled {
                h.subscription = Some(Arc::clone(&subscription));
            }
            h.cancelled
        };
        if cancelled {
            subscription.cancel();
        } else {
            subscription.request(Demand::Unlimited);
        }
    }

    fn on_value(&self, value: T) -> Demand {
        if !self.handle.lock().cancelled {
            (self.on_value.lock())(value);
        }
        Demand::NONE
    }

    fn on_completion(&self, completion: Completion<E>) {
        // Breaks the sink -> handle -> subscription -> sink cycle.
        self.handle.lock().subscription = None;
        if let Some(f) = self.on_completion.lock().take() {
            f(completion);
        }
    }
}

/// Subscribes closures to `publisher`.
pub(crate) fn attach<P, V, C>(publisher: &P, on_value: V, on_completion: C) -> Cancellable
where
    P: Publisher + ?Sized,
    V: FnMut(P::Output) + Send + 'static,
    C: FnOnce(Completion<P::Failure>) + Send + 'static,
{
    let handle = Arc::new(Mutex::new(Handle::default()));
    publisher.subscribe(Arc::new(Sink {
        handle: Arc::clone(&handle),
        on_value: Mutex::new(on_value),
        on_completion: Mutex::new(Some(on_completion)),
    }));
    Cancellable {
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{Just, Subject};

    #[test]
    fn closures_receive_value_and_completion() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Mutex::new(None));
        let (s, d) = (Arc::clone(&seen), Arc::clone(&done));

        let cancellable = attach(
            &Just::<u32, String>::new(8),
            move |v| s.lock().push(v),
            move |c| *d.lock() = Some(c),
        );

        assert_eq!(*seen.lock(), vec![8]);
        assert_eq!(*done.lock(), Some(Completion::Finished));
        assert!(!cancellable.is_cancelled());
    }

    #[test]
    fn dropping_the_handle_cancels_upstream() {
        let subject = Subject::<u32, String>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);

        let cancellable = attach(&subject, move |v| s.lock().push(v), |_| {});
        subject.send(1);
        drop(cancellable);
        subject.send(2);

        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(subject.cancellation_count(), 1);
    }

    #[test]
    fn detached_sink_keeps_receiving() {
        let subject = Subject::<u32, String>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);

        attach(&subject, move |v| s.lock().push(v), |_| {}).detach();
        subject.send(1);
        subject.send(2);

        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(subject.cancellation_count(), 0);
    }
}
