//! Runtime core: the operation queue.
//!
//! The only public API from this module is [`OperationQueue`] (with its
//! [`QueueBuilder`] and [`QueueConfig`]), which runs operations in FIFO order under
//! a concurrency limit.
//!
//! Internal modules:
//! - [`queue`]: dispatcher, submission, cancellation and shutdown;
//! - [`runner`]: runs one operation on the blocking pool and waits for its terminal state;
//! - [`registry`]: operations between submission and removal;
//! - [`builder`]: wires bus, observers and semaphore together.

mod builder;
mod config;
mod queue;
mod registry;
mod runner;

pub use builder::QueueBuilder;
pub use config::QueueConfig;
pub use queue::OperationQueue;
