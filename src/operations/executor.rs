//! Executor seam.
//!
//! Whatever runs operations: the bundled [`OperationQueue`](crate::OperationQueue)
//! or a caller-provided pool. There is no ambient default executor; scheduling calls
//! always receive one explicitly.

use super::operation::{OperationId, OperationRef};

/// Runs submitted operations on worker threads.
///
/// ### Contract
/// - `submit` enqueues the operation (calling [`Operation::enqueue`](super::Operation::enqueue))
///   and eventually calls `run` on it, unless it was cancelled first.
/// - `cancel` cancels the operation registered under `id` and forgets it. Unknown or
///   already terminated ids are ignored. Must not block.
pub trait Executor: Send + Sync + 'static {
    /// Hands `operation` over for execution and returns its handle.
    fn submit(&self, operation: OperationRef) -> OperationId;

    /// Cancels the operation registered under `id`.
    fn cancel(&self, id: OperationId);
}
