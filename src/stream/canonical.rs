//! # Canonical publishers.
//!
//! | publisher | emits                     | trait    |
//! |-----------|---------------------------|----------|
//! | [`Just`]  | one value, then `Finished`| `Single` |
//! | [`Fail`]  | `Failure(e)`              | `Single` |
//! | [`Empty`] | `Finished`                | `Maybe`  |
//! | [`Never`] | nothing, ever             | `Single` |
//!
//! `Just` and `Fail` wait for demand before emitting; they are built on
//! [`SingleSubscription`]. `Empty` completes right after the handshake since a
//! terminal signal needs no demand.

use std::marker::PhantomData;
use std::sync::Arc;

use super::protocol::{Completion, Inert, Publisher, SubscriberRef};
use crate::subscription::{Promise, SingleProducer, SingleSubscription};
use crate::traits::{MaybePublisher, SinglePublisher};

/// Producer delivering a prepared result once.
struct Ready<T, E> {
    result: Option<Result<T, E>>,
}

impl<T, E> SingleProducer for Ready<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn start(&mut self, promise: Promise<Self>) {
        if let Some(result) = self.result.take() {
            promise.deliver(result);
        }
    }

    fn did_cancel(&mut self) {
        self.result = None;
    }
}

/// Emits one value to each subscriber, then finishes.
pub struct Just<T, E> {
    value: T,
    failure: PhantomData<fn() -> E>,
}

impl<T: Clone, E> Clone for Just<T, E> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T, E> Just<T, E> {
    /// Publisher of `value`.
    pub fn new(value: T) -> Self {
        Self {
            value,
            failure: PhantomData,
        }
    }
}

impl<T, E> Publisher for Just<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe(&self, subscriber: SubscriberRef<T, E>) {
        SingleSubscription::attach(
            Ready {
                result: Some(Ok(self.value.clone())),
            },
            subscriber,
        );
    }
}

/// Fails each subscriber with the same error.
pub struct Fail<T, E> {
    error: E,
    output: PhantomData<fn() -> T>,
}

impl<T, E: Clone> Clone for Fail<T, E> {
    fn clone(&self) -> Self {
        Self::new(self.error.clone())
    }
}

impl<T, E> Fail<T, E> {
    /// Publisher failing with `error`.
    pub fn new(error: E) -> Self {
        Self {
            error,
            output: PhantomData,
        }
    }
}

impl<T, E> Publisher for Fail<T, E>
where
    T: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe(&self, subscriber: SubscriberRef<T, E>) {
        SingleSubscription::attach(
            Ready {
                result: Some(Err(self.error.clone())),
            },
            subscriber,
        );
    }
}

/// Finishes each subscriber without a value.
pub struct Empty<T, E> {
    kind: PhantomData<fn() -> (T, E)>,
}

impl<T, E> Empty<T, E> {
    /// Empty publisher.
    pub fn new() -> Self {
        Self { kind: PhantomData }
    }
}

impl<T, E> Default for Empty<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for Empty<T, E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T, E> Publisher for Empty<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe(&self, subscriber: SubscriberRef<T, E>) {
        subscriber.on_subscribe(Arc::new(Inert));
        subscriber.on_completion(Completion::Finished);
    }
}

/// Never emits and never terminates.
pub struct Never<T, E> {
    kind: PhantomData<fn() -> (T, E)>,
}

impl<T, E> Never<T, E> {
    /// Silent publisher.
    pub fn new() -> Self {
        Self { kind: PhantomData }
    }
}

impl<T, E> Default for Never<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for Never<T, E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T, E> Publisher for Never<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe(&self, subscriber: SubscriberRef<T, E>) {
        subscriber.on_subscribe(Arc::new(Inert));
    }
}

impl<T, E> MaybePublisher for Just<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
}
impl<T, E> SinglePublisher for Just<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
}

impl<T, E> MaybePublisher for Fail<T, E>
where
    T: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
}
impl<T, E> SinglePublisher for Fail<T, E>
where
    T: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
}

impl<T: Send + 'static, E: Send + 'static> MaybePublisher for Empty<T, E> {}

impl<T: Send + 'static, E: Send + 'static> MaybePublisher for Never<T, E> {}
impl<T: Send + 'static, E: Send + 'static> SinglePublisher for Never<T, E> {}
