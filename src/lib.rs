//! # streamtraits
//!
//! **streamtraits** adds cardinality promises to push-based publishers.
//!
//! A publisher may promise to emit *at most one* value ([`MaybePublisher`]) or
//! *exactly one* value ([`SinglePublisher`]) before it terminates. A promise is
//! either checked at runtime ([`Checked`], surfacing a [`CardinalityError`]) or
//! trusted ([`Assert`], checked by debug assertions only). Single-value publishers
//! can be turned into cancellable operations and scheduled on an [`Executor`] such
//! as the tokio-backed [`OperationQueue`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   any Publisher
//!        │ .check_single() / .assert_single()
//!        ▼
//! ┌──────────────────────┐   .in_operation_queue(executor)   ┌──────────────────────┐
//! │ SinglePublisher      │ ────────────────────────────────► │ InOperationQueue     │
//! └──────────┬───────────┘                                   └──────────┬───────────┘
//!            │ .operation()                                              │ subscribe + demand
//!            ▼                                                           ▼
//! ┌──────────────────────┐             submit(op)            ┌──────────────────────┐
//! │ SingleOperation      │ ◄──────────────────────────────── │ SingleSubscription   │
//! │ Pending → Ready →    │                                   │ (holds OperationId)  │
//! │ Executing → Finished │ ── observe_completion ──────────► │ deliver / cancel     │
//! │           ↘ Cancelled│                                   └──────────────────────┘
//! └──────────┬───────────┘
//!            │ owned by
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  OperationQueue (Executor)                                        │
//! │  - Registry (operations by OperationId)                           │
//! │  - dispatcher (FIFO, semaphore when max_concurrent > 0)           │
//! │  - Bus (broadcast events) ──► ObserverSet ──► Observe impls       │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Operation lifecycle
//! ```text
//! submit ──► enqueue() ──► Registry ──► dispatcher ──► run() on blocking pool
//!                                                          │
//!             upstream value + Finished ──► Finished ──────┤
//!             upstream Failure          ──► Finished ──────┤──► terminated latch
//!             cancel(id) / shutdown     ──► Cancelled ─────┘
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                                  |
//! |-------------------|--------------------------------------------------------------|-----------------------------------------------------|
//! | **Protocol**      | Demand-driven publisher / subscriber / subscription.         | [`Publisher`], [`Subscriber`], [`Subscription`]     |
//! | **Cardinality**   | Marker traits, runtime checks and trusted promises.          | [`MaybePublisher`], [`SinglePublisher`], [`Checked`], [`Assert`] |
//! | **Single base**   | One-shot subscriptions with start / cancel hooks.            | [`SingleSubscription`], [`SingleProducer`]          |
//! | **Operations**    | Single publishers as cancellable, schedulable work.          | [`SingleOperation`], [`InOperationQueue`]           |
//! | **Queue**         | FIFO executor on tokio with a concurrency limit.             | [`OperationQueue`], [`QueueConfig`]                 |
//! | **Observers**     | Hook into queue events.                                      | [`Observe`], [`Event`]                              |
//! | **Publishers**    | Canonical and type-erased publishers, a manual subject.      | [`Just`], [`Fail`], [`Empty`], [`Never`], [`AnySinglePublisher`], [`Subject`] |
//! | **Errors**        | Typed cardinality and operation errors.                      | [`CardinalityError`], [`OperationError`]            |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use streamtraits::{
//!     CardinalityError, Executor, Just, OperationQueue, PublisherExt, QueueConfig,
//!     SinglePublisherExt,
//! };
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() {
//!     let queue: Arc<dyn Executor> = OperationQueue::new(QueueConfig::serial());
//!
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     let _handle = Just::<u32, String>::new(42)
//!         .check_single()
//!         .in_operation_queue(queue)
//!         .sink_single(move |result| {
//!             let _ = tx.send(result);
//!         });
//!
//!     let result: Result<u32, CardinalityError<String>> = rx.await.unwrap();
//!     assert_eq!(result, Ok(42));
//! }
//! ```
mod core;
mod error;
mod events;
mod ext;
mod observers;
mod operations;
mod stream;
mod subscription;
mod traits;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use core::{OperationQueue, QueueBuilder, QueueConfig};
pub use error::{CardinalityError, OperationError};
pub use events::{Bus, Event, EventKind};
pub use ext::{MaybePublisherExt, PublisherExt, SinglePublisherExt};
pub use observers::{Observe, ObserverSet};
pub use operations::{
    Executor, InOperationQueue, Operation, OperationId, OperationRef, OperationState, Outcome,
    SingleOperation,
};
pub use stream::{
    AnyMaybePublisher, AnyPublisher, AnySinglePublisher, Cancellable, Completion, Demand, Empty,
    Fail, Just, Never, Publisher, Subject, Subscriber, SubscriberRef, Subscription,
    SubscriptionRef,
};
pub use subscription::{Promise, SingleProducer, SingleSubscription};
pub use traits::{
    Assert, Cardinality, CardinalityKind, Checked, Maybe, MaybePublisher, Single, SinglePublisher,
};

// Optional: expose a simple built-in logger observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
