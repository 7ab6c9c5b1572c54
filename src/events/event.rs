//! # Runtime events emitted by the operation queue.
//!
//! The [`EventKind`] enum classifies events across two categories:
//! - **Operation lifecycle**: enqueued, starting, finished, cancelled, panicked
//! - **Queue lifecycle**: shutdown
//!
//! The [`Event`] struct carries the metadata: timestamp, operation id and name, and
//! an optional reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when observers receive events
//! out of order.
//!
//! ## Example
//! ```rust
//! use streamtraits::{Event, EventKind, OperationId};
//!
//! let ev = Event::new(EventKind::OperationPanicked)
//!     .with_operation("fetch")
//!     .with_id(OperationId::new(3))
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::OperationPanicked);
//! assert_eq!(ev.operation.as_deref(), Some("fetch"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::operations::OperationId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Operation lifecycle ===
    /// Operation accepted by the queue.
    ///
    /// Sets:
    /// - `operation`, `id`
    OperationEnqueued,

    /// A worker is about to call `run`.
    ///
    /// Sets:
    /// - `operation`, `id`
    OperationStarting,

    /// Operation reached `Finished`.
    ///
    /// Sets:
    /// - `operation`, `id`
    OperationFinished,

    /// Operation reached `Cancelled` (explicit cancel, panic, or shutdown).
    ///
    /// Sets:
    /// - `operation`, `id`
    /// - `reason`: what cancelled it, when known
    OperationCancelled,

    /// `run` panicked. Always followed by `OperationCancelled`.
    ///
    /// Sets:
    /// - `operation`, `id`
    /// - `reason`: panic message
    OperationPanicked,

    // === Queue lifecycle ===
    /// `shutdown()` cancelled every pending and running operation. Last event
    /// forwarded to observers.
    QueueShutdown,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for log lines.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::OperationEnqueued => "enqueued",
            EventKind::OperationStarting => "starting",
            EventKind::OperationFinished => "finished",
            EventKind::OperationCancelled => "cancelled",
            EventKind::OperationPanicked => "panicked",
            EventKind::QueueShutdown => "queue-shutdown",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the operation, if applicable.
    pub operation: Option<Arc<str>>,
    /// Queue handle of the operation, if applicable.
    pub id: Option<OperationId>,
    /// Human-readable reason (panic message, cancel cause).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            operation: None,
            id: None,
            reason: None,
        }
    }

    /// Attaches an operation name.
    #[inline]
    pub fn with_operation(mut self, name: impl Into<Arc<str>>) -> Self {
        self.operation = Some(name.into());
        self
    }

    /// Attaches an operation id.
    #[inline]
    pub fn with_id(mut self, id: OperationId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns true for `OperationFinished` and `OperationCancelled`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::OperationFinished | EventKind::OperationCancelled
        )
    }
}
