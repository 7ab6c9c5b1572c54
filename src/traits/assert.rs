//! # Trusted cardinality promise.
//!
//! [`Assert`] gives a publisher a cardinality trait without checking it at runtime.
//! Use it only when the producer keeps the promise by construction.
//!
//! - Debug builds wrap the subscriber and panic at the point of violation: a second
//!   value, or (for [`Single`]) a `Finished` without any value. A trusted producer
//!   breaking its promise is a programming error.
//! - Release builds hand the subscriber straight to the upstream: whatever arrives is
//!   forwarded uninspected.

use std::marker::PhantomData;

use super::{CardinalityKind, Maybe, MaybePublisher, Single, SinglePublisher};
use crate::stream::{Publisher, SubscriberRef};

/// Publisher asserting, without runtime checking, that `P` keeps the promise of `K`.
pub struct Assert<P, K> {
    upstream: P,
    kind: PhantomData<K>,
}

impl<P: Clone, K> Clone for Assert<P, K> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            kind: PhantomData,
        }
    }
}

impl<P: Publisher, K: CardinalityKind> Assert<P, K> {
    /// Wraps `upstream`.
    pub fn new(upstream: P) -> Self {
        Self {
            upstream,
            kind: PhantomData,
        }
    }
}

impl<P: Publisher, K: CardinalityKind> Publisher for Assert<P, K> {
    type Output = P::Output;
    type Failure = P::Failure;

    #[cfg(debug_assertions)]
    fn subscribe(&self, subscriber: SubscriberRef<Self::Output, Self::Failure>) {
        self.upstream
            .subscribe(std::sync::Arc::new(debug::AssertSubscriber::new(
                K::CARDINALITY,
                subscriber,
            )));
    }

    #[cfg(not(debug_assertions))]
    fn subscribe(&self, subscriber: SubscriberRef<Self::Output, Self::Failure>) {
        self.upstream.subscribe(subscriber);
    }
}

impl<P: Publisher> MaybePublisher for Assert<P, Maybe> {}
impl<P: Publisher> MaybePublisher for Assert<P, Single> {}
impl<P: Publisher> SinglePublisher for Assert<P, Single> {}

#[cfg(debug_assertions)]
mod debug {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::stream::{Completion, Demand, Subscriber, SubscriberRef, SubscriptionRef};
    use crate::traits::Cardinality;

    /// Pass-through subscriber counting values.
    pub(super) struct AssertSubscriber<T, E> {
        cardinality: Cardinality,
        downstream: SubscriberRef<T, E>,
        values: AtomicUsize,
    }

    impl<T, E> AssertSubscriber<T, E> {
        pub(super) fn new(cardinality: Cardinality, downstream: SubscriberRef<T, E>) -> Self {
            Self {
                cardinality,
                downstream,
                values: AtomicUsize::new(0),
            }
        }
    }

    impl<T, E> Subscriber<T, E> for AssertSubscriber<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        fn on_subscribe(&self, subscription: SubscriptionRef) {
            self.downstream.on_subscribe(subscription);
        }

        fn on_value(&self, value: T) -> Demand {
            let seen = self.values.fetch_add(1, Ordering::AcqRel) + 1;
            assert!(
                seen <= 1,
                "{} publisher emitted more than one value",
                self.cardinality.as_label()
            );
            self.downstream.on_value(value)
        }

        fn on_completion(&self, completion: Completion<E>) {
            if matches!(completion, Completion::Finished) && !self.cardinality.allows_empty() {
                assert!(
                    self.values.load(Ordering::Acquire) == 1,
                    "single publisher finished without a value"
                );
            }
            self.downstream.on_completion(completion);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{Completion, Fail, Just, Subject};
    use crate::testing::{Recorded, Recorder};

    #[test]
    fn forwards_value_and_completion_unchanged() {
        let recorder = Recorder::<u32, String>::unlimited();
        Assert::<_, Single>::new(Just::<u32, String>::new(1)).subscribe(recorder.clone());
        assert_eq!(
            recorder.events(),
            vec![Recorded::Value(1), Recorded::Finished]
        );
    }

    #[test]
    fn forwards_failure_unchanged() {
        let recorder = Recorder::<u32, String>::unlimited();
        Assert::<_, Maybe>::new(Fail::<u32, String>::new("e".into()))
            .subscribe(recorder.clone());
        assert_eq!(recorder.events(), vec![Recorded::Failure("e".into())]);
    }

    #[test]
    fn single_value_passes_through_before_completion() {
        let subject = Subject::<u32, String>::new();
        let recorder = Recorder::<u32, String>::unlimited();
        Assert::<_, Maybe>::new(subject.clone()).subscribe(recorder.clone());

        subject.send(1);
        assert_eq!(recorder.events(), vec![Recorded::Value(1)]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "more than one value")]
    fn second_value_panics_in_debug_builds() {
        let subject = Subject::<u32, String>::new();
        let recorder = Recorder::<u32, String>::unlimited();
        Assert::<_, Maybe>::new(subject.clone()).subscribe(recorder.clone());

        subject.send(1);
        subject.send(2);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "finished without a value")]
    fn empty_single_panics_in_debug_builds() {
        let subject = Subject::<u32, String>::new();
        let recorder = Recorder::<u32, String>::unlimited();
        Assert::<_, Single>::new(subject.clone()).subscribe(recorder.clone());

        subject.send_completion(Completion::Finished);
    }
}
