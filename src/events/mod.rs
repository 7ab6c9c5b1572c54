//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to publish
//! events emitted by the [`OperationQueue`](crate::OperationQueue).
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `OperationQueue::{submit, cancel, shutdown}`, the dispatcher
//!   and its per-operation workers.
//! - **Consumers**: the queue's observer listener (fans out to `ObserverSet`) and any
//!   receiver obtained from `OperationQueue::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
