//! The queue's event channel.
//!
//! Every queue path (`submit`, `cancel`, the dispatcher's workers, `shutdown`)
//! publishes into one [`Bus`]. Two kinds of readers sit on the other end: the
//! observer listener, which feeds the [`ObserverSet`](crate::ObserverSet), and
//! whoever called [`OperationQueue::events`](crate::OperationQueue::events).
//!
//! Publishing never waits. A reader that falls behind by more than the bus
//! capacity loses the oldest events and sees `RecvError::Lagged`. Events sent while
//! nobody listens are gone.

use tokio::sync::broadcast;

use super::event::Event;

/// Sending half of the queue's event channel. Clones share one channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// A bus keeping up to `capacity` unread events per reader, at least one.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, ev: Event) {
        // No reader is not an error.
        let _ = self.tx.send(ev);
    }

    /// A reader for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
