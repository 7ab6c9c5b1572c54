//! Operations: single-result publishers turned into schedulable, cancellable work.
//!
//! - [`SingleOperation`] wraps a [`SinglePublisher`](crate::SinglePublisher) and runs
//!   it when an executor says so;
//! - [`InOperationQueue`] is the publisher that builds one such operation per
//!   subscription and submits it to an [`Executor`];
//! - [`Operation`], [`OperationState`], [`OperationId`] and [`Outcome`] form the
//!   contract between operations and executors.

mod executor;
mod operation;
mod publisher;
mod single;

pub use executor::Executor;
pub use operation::{Operation, OperationId, OperationRef, OperationState, Outcome};
pub use publisher::InOperationQueue;
pub use single::SingleOperation;
