//! # Operation registry.
//!
//! Owns the operations of a queue between `submit` and their removal, keyed by
//! [`OperationId`].
//!
//! ## Rules
//! - An operation is removed exactly once: by `take` (explicit cancel, end of run)
//!   or by `drain` (shutdown). Whoever removes it publishes its terminal event.
//! - Callers never hold the lock while calling into an operation.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::operations::{OperationId, OperationRef};

/// Registry of live operations.
#[derive(Default)]
pub(super) struct Registry {
    operations: Mutex<HashMap<OperationId, OperationRef>>,
}

impl Registry {
    pub(super) fn insert(&self, id: OperationId, operation: OperationRef) {
        self.operations.lock().insert(id, operation);
    }

    pub(super) fn get(&self, id: OperationId) -> Option<OperationRef> {
        self.operations.lock().get(&id).cloned()
    }

    /// Atomically removes the operation registered under `id`.
    pub(super) fn take(&self, id: OperationId) -> Option<OperationRef> {
        self.operations.lock().remove(&id)
    }

    /// Removes every operation, in id order.
    pub(super) fn drain(&self) -> Vec<(OperationId, OperationRef)> {
        let mut all: Vec<_> = self.operations.lock().drain().collect();
        all.sort_unstable_by_key(|(id, _)| *id);
        all
    }

    /// Returns sorted list of registered ids.
    pub(super) fn list(&self) -> Vec<OperationId> {
        let mut ids: Vec<OperationId> = self.operations.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub(super) fn len(&self) -> usize {
        self.operations.lock().len()
    }
}
