//! # Push protocol: publishers, subscribers and subscriptions.
//!
//! A [`Publisher`] hands each subscriber its own [`Subscription`]. The subscriber
//! pulls by requesting [`Demand`], the publisher pushes values up to that demand and
//! then at most one [`Completion`].
//!
//! ## Handshake
//! ```text
//! Publisher::subscribe(sub)
//!     └─► sub.on_subscribe(subscription)
//!             └─► subscription.request(Demand::Max(n))
//!                     ├─► sub.on_value(v) -> extra demand   (≤ outstanding demand)
//!                     ├─► ...
//!                     └─► sub.on_completion(Finished | Failure(e))   (at most once)
//!
//! subscription.cancel()  ── any time, any thread, idempotent
//! ```
//!
//! ## Rules
//! - No values beyond outstanding demand.
//! - Nothing after a terminal signal, never two terminal signals.
//! - After `cancel()` nothing reaches the subscriber; values already in flight may
//!   be dropped but never duplicated.
//! - Every callback takes `&self`: subscribers and subscriptions are shared as `Arc`.

use std::sync::Arc;

/// Shared handle to a subscription.
pub type SubscriptionRef = Arc<dyn Subscription>;

/// Shared handle to a subscriber of `T` values failing with `E`.
pub type SubscriberRef<T, E> = Arc<dyn Subscriber<T, E>>;

/// Number of values a subscriber is willing to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demand {
    /// No upper bound.
    Unlimited,
    /// At most `n` more values.
    Max(usize),
}

impl Demand {
    /// No additional demand.
    pub const NONE: Demand = Demand::Max(0);

    /// Returns true when no value may be delivered.
    #[inline]
    pub fn is_none(self) -> bool {
        matches!(self, Demand::Max(0))
    }

    /// Adds two demands, saturating into [`Demand::Unlimited`].
    #[inline]
    pub fn saturating_add(self, other: Demand) -> Demand {
        match (self, other) {
            (Demand::Max(a), Demand::Max(b)) => a
                .checked_add(b)
                .map_or(Demand::Unlimited, Demand::Max),
            _ => Demand::Unlimited,
        }
    }

    /// Consumes one unit of demand. Returns `false` if there was none.
    #[inline]
    pub fn take_one(&mut self) -> bool {
        match self {
            Demand::Unlimited => true,
            Demand::Max(0) => false,
            Demand::Max(n) => {
                *n -= 1;
                true
            }
        }
    }
}

/// Terminal signal of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<E> {
    /// The publisher finished normally.
    Finished,
    /// The publisher terminated with an error.
    Failure(E),
}

impl<E> Completion<E> {
    /// Maps the failure payload.
    pub fn map_failure<F>(self, f: impl FnOnce(E) -> F) -> Completion<F> {
        match self {
            Completion::Finished => Completion::Finished,
            Completion::Failure(e) => Completion::Failure(f(e)),
        }
    }
}

/// Link between one publisher and one subscriber.
pub trait Subscription: Send + Sync + 'static {
    /// Asks the publisher for more values.
    fn request(&self, demand: Demand);

    /// Stops delivery permanently. Calling it again is a no-op.
    fn cancel(&self);
}

/// Consumer side of the protocol.
///
/// Callbacks for one subscription are never invoked concurrently by a well-behaved
/// publisher, but they may arrive on any thread.
pub trait Subscriber<T, E>: Send + Sync + 'static {
    /// Receives the subscription. Usually requests the initial demand.
    fn on_subscribe(&self, subscription: SubscriptionRef);

    /// Receives one value and returns the additional demand it wants.
    fn on_value(&self, value: T) -> Demand;

    /// Receives the terminal signal.
    fn on_completion(&self, completion: Completion<E>);
}

/// Producer of a lazily started sequence of values.
///
/// Each call to [`subscribe`](Publisher::subscribe) is an independent run.
pub trait Publisher: Send + Sync + 'static {
    /// Value type.
    type Output: Send + 'static;
    /// Failure type.
    type Failure: Send + 'static;

    /// Attaches a subscriber and hands it a fresh subscription.
    fn subscribe(&self, subscriber: SubscriberRef<Self::Output, Self::Failure>);
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe(&self, subscriber: SubscriberRef<Self::Output, Self::Failure>) {
        (**self).subscribe(subscriber)
    }
}

/// Subscription with nothing behind it, for publishers that never emit on demand.
pub(crate) struct Inert;

impl Subscription for Inert {
    fn request(&self, _demand: Demand) {}
    fn cancel(&self) {}
}
