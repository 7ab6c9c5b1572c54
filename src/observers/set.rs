//! # ObserverSet: per-observer lanes fed by the queue's event listener.
//!
//! Each observer gets a lane: a bounded channel drained by its own task, so a slow
//! observer only delays itself. The queue's listener owns the set, feeds it with
//! [`emit`](ObserverSet::emit) and, once it has forwarded `QueueShutdown`, calls
//! [`close`](ObserverSet::close) to let every lane finish what it already holds.
//!
//! ```text
//! listener ─ emit(&Event) ─┬─► lane "log"     ─► on_event()  (panics reported, lane lives on)
//!                          └─► lane "metrics" ─► on_event()
//! QueueShutdown ─► close() ─► lanes drained ─► tasks joined
//! ```
//!
//! A full lane drops the event for that observer only.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::Observe;
use crate::error::panic_message;
use crate::events::Event;

struct Lane {
    observer: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Observers of one queue, each behind its own bounded lane.
pub struct ObserverSet {
    lanes: Vec<Lane>,
    tasks: JoinSet<()>,
}

impl ObserverSet {
    /// Spawns one lane per observer. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn Observe>>) -> Self {
        let mut tasks = JoinSet::new();
        let lanes = observers
            .into_iter()
            .map(|observer| {
                let (tx, rx) = mpsc::channel(observer.queue_capacity().max(1));
                let name = observer.name();
                tasks.spawn(drain_lane(observer, rx));
                Lane { observer: name, tx }
            })
            .collect();
        Self { lanes, tasks }
    }

    /// Queues `event` on every lane without waiting.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        for lane in &self.lanes {
            if let Err(err) = lane.tx.try_send(Arc::clone(&event)) {
                let why = match err {
                    mpsc::error::TrySendError::Full(_) => "lane full",
                    mpsc::error::TrySendError::Closed(_) => "lane closed",
                };
                eprintln!(
                    "[streamtraits] observer '{}' missed {} event: {why}",
                    lane.observer,
                    event.kind.as_label()
                );
            }
        }
    }

    /// Closes every lane and waits until each observer handled what it had queued.
    pub async fn close(mut self) {
        self.lanes.clear();
        while self.tasks.join_next().await.is_some() {}
    }

    /// True if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

async fn drain_lane(observer: Arc<dyn Observe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(event) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(observer.on_event(&event))
            .catch_unwind()
            .await;
        if let Err(payload) = handled {
            eprintln!(
                "[streamtraits] observer '{}' panicked on {} event: {}",
                observer.name(),
                event.kind.as_label(),
                panic_message(payload.as_ref())
            );
        }
    }
}
