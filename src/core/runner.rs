//! # Run one operation on a worker.
//!
//! Executes one [`Operation`] and waits for its terminal state, publishing lifecycle
//! events to [`Bus`].
//!
//! ## Flow
//! ```text
//! publish OperationStarting
//! spawn_blocking(op.run())
//!     └─ Err(JoinError) ──► publish OperationPanicked, op.cancel()
//! select:
//!     op.terminated()      ──► done
//!     shutdown token       ──► op.cancel()
//! ```
//!
//! ## Rules
//! - `run` is synchronous and may block, so it goes to the blocking pool.
//! - `run` returning does not mean the operation is done: its result can arrive
//!   later from another thread. The slot is held until `terminated()` fires.
//! - The terminal event is published by the caller, after registry removal.

use tokio_util::sync::CancellationToken;

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::operations::{OperationId, OperationRef, OperationState};

/// Runs `op` and returns once it reached a terminal state.
pub(super) async fn run_once(
    op: &OperationRef,
    id: OperationId,
    shutdown: &CancellationToken,
    bus: &Bus,
) -> OperationState {
    bus.publish(
        Event::new(EventKind::OperationStarting)
            .with_operation(op.name())
            .with_id(id),
    );

    let worker = {
        let op = OperationRef::clone(op);
        tokio::task::spawn_blocking(move || op.run())
    };
    if let Err(join_err) = worker.await {
        publish_panicked(bus, op, id, join_err);
        op.cancel();
    }

    let terminated = op.terminated();
    tokio::select! {
        _ = terminated.cancelled() => {}
        _ = shutdown.cancelled() => op.cancel(),
    }
    op.state()
}

/// Publishes `OperationPanicked` (always followed by `OperationCancelled`).
fn publish_panicked(bus: &Bus, op: &OperationRef, id: OperationId, err: tokio::task::JoinError) {
    let reason = if err.is_panic() {
        panic_message(err.into_panic().as_ref())
    } else {
        "operation worker was aborted".to_string()
    };
    bus.publish(
        Event::new(EventKind::OperationPanicked)
            .with_operation(op.name())
            .with_id(id)
            .with_reason(reason),
    );
}
