//! The [`Observe`] trait: plug custom handlers into an
//! [`OperationQueue`](crate::OperationQueue)'s event stream.
//!
//! An observer sees the queue's events in publishing order, one at a time, on a
//! task of its own. It cannot slow the queue down: when its lane of
//! [`queue_capacity`](Observe::queue_capacity) events is full, further events skip
//! it. A panic in [`on_event`](Observe::on_event) is reported on stderr and the
//! next event is delivered as usual.
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use async_trait::async_trait;
//! use streamtraits::{Event, EventKind, Observe};
//!
//! #[derive(Default)]
//! struct PanicCounter(AtomicUsize);
//!
//! #[async_trait]
//! impl Observe for PanicCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::OperationPanicked {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "panic-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Handler for queue events, registered with
/// [`QueueBuilder::with_observers`](crate::QueueBuilder::with_observers).
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Handles one event. Long awaits here only delay this observer.
    async fn on_event(&self, event: &Event);

    /// Label used when reporting dropped events and panics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// How many events may wait for this observer before new ones are dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
