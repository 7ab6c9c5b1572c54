//! # Queue configuration.
//!
//! Provides [`QueueConfig`], the settings of an [`OperationQueue`](crate::OperationQueue).
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no semaphore created)

/// Configuration for the operation queue.
///
/// ## Field semantics
/// - `max_concurrent`: operations executing at once (`0` = unlimited)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
///
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Maximum number of operations executing concurrently.
    ///
    /// - `0` = unlimited
    /// - `n > 0` = at most `n` operations between `Executing` and their terminal state;
    ///   the others wait in FIFO order
    pub max_concurrent: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl QueueConfig {
    /// Configuration with a single worker slot: operations execute one after another.
    #[must_use]
    pub fn serial() -> Self {
        Self {
            max_concurrent: 1,
            ..Self::default()
        }
    }

    /// Returns the concurrency limit as an `Option`.
    ///
    /// - `None` → unlimited (no semaphore)
    /// - `Some(n)` → at most `n` concurrent operations
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            bus_capacity: 1024,
        }
    }
}
