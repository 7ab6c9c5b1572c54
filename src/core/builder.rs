use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::{config::QueueConfig, queue::OperationQueue, registry::Registry};
use crate::{
    events::Bus,
    observers::{Observe, ObserverSet},
};

/// Builder for constructing an [`OperationQueue`] with optional observers.
pub struct QueueBuilder {
    cfg: QueueConfig,
    observers: Vec<Arc<dyn Observe>>,
}

impl QueueBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: QueueConfig) -> Self {
        Self {
            cfg,
            observers: Vec::new(),
        }
    }

    /// Sets event observers.
    ///
    /// Each observer gets its own bounded lane. Lanes are drained and closed after
    /// the queue shuts down.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Builds the queue and spawns its dispatcher and observer listener.
    ///
    /// # Panics
    /// If called outside a tokio runtime.
    pub fn build(self) -> Arc<OperationQueue> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let observers = ObserverSet::new(self.observers);
        let runtime_token = CancellationToken::new();

        let semaphore = self
            .cfg
            .concurrency_limit()
            .map(Semaphore::new)
            .map(Arc::new);

        OperationQueue::start(
            self.cfg,
            bus,
            observers,
            Arc::new(Registry::default()),
            runtime_token,
            semaphore,
        )
    }
}
