//! Extension methods for publishers.
//!
//! Blanket-implemented for every publisher of the matching cardinality, the way
//! `futures::StreamExt` extends every stream:
//!
//! - [`PublisherExt`]: cardinality checks and trust, closure sinks, type erasure.
//! - [`MaybePublisherExt`]: a sink receiving `Result<Option<T>, E>`.
//! - [`SinglePublisherExt`]: operations, queue scheduling, a sink receiving `Result<T, E>`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::operations::{Executor, InOperationQueue, SingleOperation};
use crate::stream::{
    AnyMaybePublisher, AnyPublisher, AnySinglePublisher, Cancellable, Completion, Publisher,
    sink,
};
use crate::traits::{Assert, CardinalityKind, Checked, Maybe, MaybePublisher, Single, SinglePublisher};

/// Combinators available on every [`Publisher`].
pub trait PublisherExt: Publisher + Sized {
    /// Promises at most one value, verified at runtime.
    ///
    /// A second value fails the stream with
    /// [`CardinalityError::TooManyValues`](crate::CardinalityError::TooManyValues).
    fn check_maybe(self) -> Checked<Self, Maybe> {
        Checked::new(self)
    }

    /// Promises exactly one value, verified at runtime.
    ///
    /// Finishing without a value fails with
    /// [`CardinalityError::NoValue`](crate::CardinalityError::NoValue).
    fn check_single(self) -> Checked<Self, Single> {
        Checked::new(self)
    }

    /// Generic form of [`check_maybe`](Self::check_maybe) / [`check_single`](Self::check_single).
    fn check<K: CardinalityKind>(self) -> Checked<Self, K> {
        Checked::new(self)
    }

    /// Promises at most one value without checking it in release builds.
    fn assert_maybe(self) -> Assert<Self, Maybe> {
        Assert::new(self)
    }

    /// Promises exactly one value without checking it in release builds.
    fn assert_single(self) -> Assert<Self, Single> {
        Assert::new(self)
    }

    /// Subscribes with unlimited demand, handing every signal to the closures.
    fn sink<V, C>(&self, on_value: V, on_completion: C) -> Cancellable
    where
        V: FnMut(Self::Output) + Send + 'static,
        C: FnOnce(Completion<Self::Failure>) + Send + 'static,
    {
        sink::attach(self, on_value, on_completion)
    }

    /// Hides the concrete type behind an [`AnyPublisher`].
    fn erase_to_any(self) -> AnyPublisher<Self::Output, Self::Failure> {
        AnyPublisher::new(self)
    }
}

impl<P: Publisher> PublisherExt for P {}

/// Combinators for publishers emitting at most one value.
pub trait MaybePublisherExt: MaybePublisher + Sized {
    /// Subscribes and calls `on_result` once with the value (if any) or the failure.
    ///
    /// Not called if the subscription is cancelled first.
    fn sink_maybe<F>(&self, on_result: F) -> Cancellable
    where
        F: FnOnce(Result<Option<Self::Output>, Self::Failure>) + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));
        let store = Arc::clone(&slot);
        sink::attach(
            self,
            move |value| *store.lock() = Some(value),
            move |completion| match completion {
                Completion::Finished => on_result(Ok(slot.lock().take())),
                Completion::Failure(e) => on_result(Err(e)),
            },
        )
    }

    /// Hides the concrete type, keeping the at-most-one promise.
    fn erase_to_any_maybe(self) -> AnyMaybePublisher<Self::Output, Self::Failure> {
        AnyMaybePublisher::new(self)
    }
}

impl<P: MaybePublisher> MaybePublisherExt for P {}

/// Combinators for publishers emitting exactly one value.
pub trait SinglePublisherExt: SinglePublisher + Sized {
    /// Wraps this publisher in a [`SingleOperation`] without scheduling it.
    ///
    /// The caller drives it: `enqueue`, `run` on any thread, `cancel` from anywhere.
    fn operation(self) -> Arc<SingleOperation<Self>> {
        SingleOperation::new(self)
    }

    /// Defers every subscription to an operation scheduled on `executor`.
    ///
    /// Nothing is submitted until the subscriber requests demand.
    fn in_operation_queue(self, executor: Arc<dyn Executor>) -> InOperationQueue<Self>
    where
        Self: Clone,
    {
        InOperationQueue::new(self, executor)
    }

    /// Subscribes and calls `on_result` once with the value or the failure.
    ///
    /// Not called if the subscription is cancelled first, nor if the publisher
    /// finishes without the value it promised.
    fn sink_single<F>(&self, on_result: F) -> Cancellable
    where
        F: FnOnce(Result<Self::Output, Self::Failure>) + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));
        let store = Arc::clone(&slot);
        sink::attach(
            self,
            move |value| *store.lock() = Some(value),
            move |completion| match completion {
                Completion::Finished => {
                    if let Some(value) = slot.lock().take() {
                        on_result(Ok(value));
                    }
                }
                Completion::Failure(e) => on_result(Err(e)),
            },
        )
    }

    /// Hides the concrete type, keeping the exactly-one promise.
    fn erase_to_any_single(self) -> AnySinglePublisher<Self::Output, Self::Failure> {
        AnySinglePublisher::new(self)
    }
}

impl<P: SinglePublisher> SinglePublisherExt for P {}
