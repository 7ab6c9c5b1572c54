//! # InOperationQueue: run a single-result publisher on an executor.
//!
//! Each subscription gets its own [`SingleOperation`], built lazily once the
//! subscriber requests a value:
//!
//! ```text
//! subscribe ──► SingleSubscription (waits for demand)
//! request(1) ──► start():  SingleOperation::new(upstream)
//!                          observe_completion(Completed(r) → deliver r,
//!                                             Cancelled    → cancel, no terminal signal)
//!                          executor.submit(op) → OperationId
//! cancel() ──► did_cancel(): executor.cancel(id)       (never waits)
//! ```
//!
//! The subscription keeps only the [`OperationId`]; the executor's registry owns the
//! operation and the operation owns the observer, so there is no reference cycle.

use std::sync::Arc;

use super::executor::Executor;
use super::operation::{OperationId, Outcome};
use super::single::SingleOperation;
use crate::stream::{Publisher, SubscriberRef};
use crate::subscription::{Promise, SingleProducer, SingleSubscription};
use crate::traits::{MaybePublisher, SinglePublisher};

/// Publisher delivering the result of `upstream` computed on `executor`.
pub struct InOperationQueue<P> {
    upstream: P,
    executor: Arc<dyn Executor>,
}

impl<P: Clone> Clone for InOperationQueue<P> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<P: SinglePublisher + Clone> InOperationQueue<P> {
    /// Schedules `upstream` on `executor`, once per subscription.
    pub fn new(upstream: P, executor: Arc<dyn Executor>) -> Self {
        Self { upstream, executor }
    }
}

impl<P: SinglePublisher + Clone> Publisher for InOperationQueue<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe(&self, subscriber: SubscriberRef<Self::Output, Self::Failure>) {
        SingleSubscription::attach(
            Scheduled {
                upstream: Some(self.upstream.clone()),
                executor: Arc::clone(&self.executor),
                operation: None,
            },
            subscriber,
        );
    }
}

impl<P: SinglePublisher + Clone> MaybePublisher for InOperationQueue<P> {}
impl<P: SinglePublisher + Clone> SinglePublisher for InOperationQueue<P> {}

struct Scheduled<P> {
    upstream: Option<P>,
    executor: Arc<dyn Executor>,
    operation: Option<OperationId>,
}

impl<P: SinglePublisher> SingleProducer for Scheduled<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn start(&mut self, promise: Promise<Self>) {
        let Some(upstream) = self.upstream.take() else { return };
        let operation = SingleOperation::new(upstream);

        let forwarded = operation.observe_completion(move |outcome| match outcome {
            Outcome::Completed(result) => promise.deliver(result),
            Outcome::Cancelled => promise.cancel(),
        });
        if forwarded.is_err() {
            return;
        }
        self.operation = Some(self.executor.submit(operation));
    }

    fn did_cancel(&mut self) {
        if let Some(id) = self.operation.take() {
            self.executor.cancel(id);
        }
    }
}
