//! Type-erased publishers.
//!
//! Erasure keeps the cardinality trait: an [`AnySinglePublisher`] can only be made
//! from a [`SinglePublisher`], and it still is one.

use std::sync::Arc;

use super::canonical::{Empty, Fail, Just, Never};
use super::protocol::{Publisher, SubscriberRef};
use crate::traits::{MaybePublisher, SinglePublisher};

type Erased<T, E> = Arc<dyn Publisher<Output = T, Failure = E>>;

macro_rules! erased_publisher {
    ($(#[$doc:meta])* $name:ident, $bound:ident) => {
        $(#[$doc])*
        pub struct $name<T: Send + 'static, E: Send + 'static> {
            inner: Erased<T, E>,
        }

        impl<T: Send + 'static, E: Send + 'static> Clone for $name<T, E> {
            fn clone(&self) -> Self {
                Self {
                    inner: Arc::clone(&self.inner),
                }
            }
        }

        impl<T, E> $name<T, E>
        where
            T: Send + 'static,
            E: Send + 'static,
        {
            /// Erases the concrete type of `publisher`.
            pub fn new<P>(publisher: P) -> Self
            where
                P: $bound + Publisher<Output = T, Failure = E>,
            {
                Self {
                    inner: Arc::new(publisher),
                }
            }

            /// Publisher emitting `value`, then finishing.
            pub fn just(value: T) -> Self
            where
                T: Clone + Sync,
            {
                Self::new(Just::new(value))
            }

            /// Publisher failing with `error`.
            pub fn fail(error: E) -> Self
            where
                E: Clone + Sync,
            {
                Self::new(Fail::new(error))
            }

            /// Publisher that never terminates.
            pub fn never() -> Self {
                Self::new(Never::new())
            }
        }

        impl<T, E> Publisher for $name<T, E>
        where
            T: Send + 'static,
            E: Send + 'static,
        {
            type Output = T;
            type Failure = E;

            fn subscribe(&self, subscriber: SubscriberRef<T, E>) {
                self.inner.subscribe(subscriber);
            }
        }
    };
}

erased_publisher!(
    /// Any publisher of `T` failing with `E`.
    AnyPublisher,
    Publisher
);

erased_publisher!(
    /// Any publisher emitting at most one value.
    AnyMaybePublisher,
    MaybePublisher
);

erased_publisher!(
    /// Any publisher emitting exactly one value.
    AnySinglePublisher,
    SinglePublisher
);

impl<T: Send + 'static, E: Send + 'static> AnyPublisher<T, E> {
    /// Publisher finishing without a value.
    pub fn empty() -> Self {
        Self::new(Empty::new())
    }
}

impl<T: Send + 'static, E: Send + 'static> AnyMaybePublisher<T, E> {
    /// Publisher finishing without a value.
    pub fn empty() -> Self {
        Self::new(Empty::new())
    }
}

impl<T: Send + 'static, E: Send + 'static> MaybePublisher for AnyMaybePublisher<T, E> {}

impl<T: Send + 'static, E: Send + 'static> MaybePublisher for AnySinglePublisher<T, E> {}
impl<T: Send + 'static, E: Send + 'static> SinglePublisher for AnySinglePublisher<T, E> {}
