use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::QueueConfig,
    error::QueueError,
    events::Bus,
    executor::ExecutorRef,
    items::{Output, Payload, QueueSnapshot},
    subscribers::{Subscribe, SubscriberSet},
};
use super::{
    notifier::{CompletionFn, Notifier},
    queue::{BulkQueue, Shared},
};

/// Builder for constructing a [`BulkQueue`] with optional features.
pub struct BulkQueueBuilder<P, R> {
    cfg: QueueConfig,
    executor: ExecutorRef<P, R>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    on_complete: Option<CompletionFn<P, R>>,
}

impl<P: Payload, R: Output> BulkQueueBuilder<P, R> {
    /// Creates a new builder with the given executor and configuration.
    pub fn new(executor: ExecutorRef<P, R>, cfg: QueueConfig) -> Self {
        Self {
            cfg,
            executor,
            subscribers: Vec::new(),
            on_complete: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive queue events (dispatches, settlements, drain cycles)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the completion callback, invoked once per fully drained cycle
    /// with the final snapshot.
    ///
    /// A cycle interrupted by [`clear_queue`](BulkQueue::clear_queue) does not invoke it.
    /// A panic inside the callback is caught and reported as
    /// [`CallbackPanicked`](crate::EventKind::CallbackPanicked).
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&QueueSnapshot<P, R>) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(f));
        self
    }

    /// Builds the queue.
    ///
    /// This consumes the builder and initializes:
    /// - Event bus for broadcasting
    /// - Subscriber workers (spawned only when subscribers are set; requires a Tokio runtime)
    /// - The item store and status channel
    ///
    /// Fails with [`QueueError::InvalidConfig`] when the configuration is structurally invalid.
    pub fn build(self) -> Result<BulkQueue<P, R>, QueueError> {
        self.cfg.validate()?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            tokio::spawn(set.run(bus.tap("subscribers"), runtime_token.clone()));
        }

        let notifier = Notifier::new(self.on_complete, bus.clone());
        let shared = Shared::new(self.cfg, self.executor, bus, notifier, runtime_token);
        Ok(BulkQueue::from_shared(Arc::new(shared)))
    }
}
