//! # Operation abstraction.
//!
//! An [`Operation`] is a synchronous, cancellable unit of work with a monotonic
//! lifecycle. Executors hold operations as [`OperationRef`] (`Arc<dyn Operation>`)
//! and address them by [`OperationId`].
//!
//! ```text
//! Pending ──enqueue()──► Ready ──run()──► Executing ──result──► Finished
//!    │                     │                  │
//!    └──────cancel()───────┴─────cancel()─────┴──────────────► Cancelled
//! ```
//!
//! `run()` may return while the operation is still `Executing` (its work can
//! complete on another thread). The [`terminated`](Operation::terminated) token is
//! cancelled on the transition to `Finished` or `Cancelled`; executors await it to
//! know when the slot is free again.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Shared handle to an operation.
pub type OperationRef = Arc<dyn Operation>;

/// Lifecycle state of an operation. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    /// Created, not handed to an executor yet.
    Pending,
    /// Enqueued, waiting for a worker.
    Ready,
    /// Running: the upstream is subscribed.
    Executing,
    /// A result was recorded.
    Finished,
    /// Cancelled before a result was recorded.
    Cancelled,
}

impl OperationState {
    /// Returns true for `Finished` and `Cancelled`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Finished | OperationState::Cancelled)
    }

    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            OperationState::Pending => "pending",
            OperationState::Ready => "ready",
            OperationState::Executing => "executing",
            OperationState::Finished => "finished",
            OperationState::Cancelled => "cancelled",
        }
    }
}

/// What an operation reports to its completion observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The upstream produced its single result.
    Completed(Result<T, E>),
    /// The operation was cancelled; no result exists.
    Cancelled,
}

impl<T, E> Outcome<T, E> {
    /// Returns the result, or `None` if cancelled.
    pub fn into_result(self) -> Option<Result<T, E>> {
        match self {
            Outcome::Completed(r) => Some(r),
            Outcome::Cancelled => None,
        }
    }
}

/// Handle of an operation inside an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    /// Wraps a raw id. Executors are responsible for uniqueness.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// # Cancellable unit of work.
///
/// Every method may be called from any thread.
///
/// ### Contract
/// - [`run`](Operation::run) does nothing once the operation was cancelled or has
///   already run.
/// - [`cancel`](Operation::cancel) is idempotent and a no-op once terminal.
/// - [`terminated`](Operation::terminated) is cancelled exactly when the state
///   becomes terminal.
pub trait Operation: Send + Sync + 'static {
    /// Human-readable name for logs and events.
    fn name(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> OperationState;

    /// Returns true once cancelled.
    fn is_cancelled(&self) -> bool {
        self.state() == OperationState::Cancelled
    }

    /// Marks the operation as enqueued (`Pending → Ready`).
    fn enqueue(&self);

    /// Starts the work on the calling thread.
    fn run(&self);

    /// Cancels the operation.
    fn cancel(&self);

    /// Token cancelled on the terminal transition.
    fn terminated(&self) -> CancellationToken;
}
