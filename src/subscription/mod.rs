//! Publisher-side subscription building blocks.
//!
//! - [`SingleSubscription`]: deferred-start, single-result subscription driven by a
//!   [`SingleProducer`].
//! - [`Promise`]: one-shot handle a producer uses to report its result.

mod single;

pub use single::{Promise, SingleProducer, SingleSubscription};
