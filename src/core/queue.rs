//! # BulkQueue: the consumer-facing handle.
//!
//! [`BulkQueue`] is a cheap, cloneable handle over shared state. Every
//! operation is synchronous and applied atomically under the store lock;
//! dispatching happens on a background drain task spawned by
//! [`process_queue`](BulkQueue::process_queue).
//!
//! ## Architecture
//! ```text
//! add_items / retry_* / remove_item / clear_queue
//!        │
//!        ▼
//!  Mutex<QueueStore> ──send_replace──► watch<QueueStatus> ──► watch() / wait_idle()
//!        ▲
//!        │ take_next / settle / finish / close
//!  drain task (one per cycle) ──► JoinSet { settle(dispatch) ... }
//!        │
//!        └──► Notifier ──► on_complete(snapshot)       (once per cycle)
//!
//! every step ── publish(Event) ──► Bus ──► Tap ──► SubscriberSet::run
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use bulkvisor::{BulkQueue, ExecutorFn, ItemId, QueueConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exec = ExecutorFn::arc(|_id: ItemId, cents: u32| async move {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!         Ok::<_, anyhow::Error>(cents)
//!     });
//!
//!     let queue = BulkQueue::builder(exec, QueueConfig::new(2, Duration::from_millis(10)))
//!         .on_complete(|snap| println!("done: {}/{}", snap.progress.success, snap.progress.total))
//!         .build()?;
//!
//!     queue.add_items([("7981234", 1999), ("7981235", 2499)]);
//!     queue.process_queue();
//!     queue.wait_idle().await;
//!
//!     assert_eq!(queue.progress().success, 2);
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::QueueConfig;
use crate::core::builder::BulkQueueBuilder;
use crate::core::dispatcher;
use crate::core::notifier::Notifier;
use crate::core::store::{AddReport, Begin, QueueStore};
use crate::events::{Bus, Event, EventKind};
use crate::executor::ExecutorRef;
use crate::items::{ItemId, Output, Payload, QueueItem, QueueSnapshot, QueueStatus};
use crate::progress::Progress;

/// What [`BulkQueue::process_queue`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A new drain cycle was started.
    Started {
        /// Cycle number (1-based, per queue).
        cycle: u64,
    },
    /// A drain is already running; newly pending items join it.
    AlreadyRunning,
    /// No pending items; nothing was started and no completion will fire.
    NothingPending,
}

/// State shared by the handle, the drain task and in-flight settlements.
pub(crate) struct Shared<P, R> {
    pub(crate) cfg: QueueConfig,
    pub(crate) executor: ExecutorRef<P, R>,
    pub(crate) bus: Bus,
    pub(crate) notifier: Notifier<P, R>,
    pub(crate) wake: Notify,
    store: Mutex<QueueStore<P, R>>,
    last_start: Mutex<Option<Instant>>,
    status_tx: watch::Sender<QueueStatus>,
    runtime_token: CancellationToken,
}

impl<P: Payload, R: Output> Shared<P, R> {
    pub(crate) fn new(
        cfg: QueueConfig,
        executor: ExecutorRef<P, R>,
        bus: Bus,
        notifier: Notifier<P, R>,
        runtime_token: CancellationToken,
    ) -> Self {
        let store = QueueStore::new(cfg.admission);
        let (status_tx, _) = watch::channel(store.status());
        Self {
            cfg,
            executor,
            bus,
            notifier,
            wake: Notify::new(),
            store: Mutex::new(store),
            last_start: Mutex::new(None),
            status_tx,
            runtime_token,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueStore<P, R>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `f` under the lock and publishes the resulting status.
    pub(crate) fn mutate<T>(&self, f: impl FnOnce(&mut QueueStore<P, R>) -> T) -> T {
        let mut store = self.lock();
        let out = f(&mut store);
        self.status_tx.send_replace(store.status());
        out
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&QueueStore<P, R>) -> T) -> T {
        f(&self.lock())
    }

    /// Earliest instant the next dispatch may start; `None` when unpaced or nothing ran yet.
    pub(crate) fn next_start(&self) -> Option<Instant> {
        let delay = self.cfg.pacing()?;
        let last = *self.last_start.lock().unwrap_or_else(PoisonError::into_inner);
        last.map(|at| at + delay)
    }

    pub(crate) fn mark_started(&self, at: Instant) {
        *self.last_start.lock().unwrap_or_else(PoisonError::into_inner) = Some(at);
    }
}

impl<P, R> Drop for Shared<P, R> {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}

/// Handle to a bulk-update queue.
///
/// Clones share the same queue. Methods that start work
/// ([`process_queue`](Self::process_queue), and [`build`](BulkQueueBuilder::build)
/// when subscribers are configured) must be called inside a Tokio runtime.
pub struct BulkQueue<P, R> {
    shared: Arc<Shared<P, R>>,
}

impl<P, R> Clone for BulkQueue<P, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: Payload, R: Output> BulkQueue<P, R> {
    /// Starts building a queue around `executor`.
    pub fn builder(executor: ExecutorRef<P, R>, cfg: QueueConfig) -> BulkQueueBuilder<P, R> {
        BulkQueueBuilder::new(executor, cfg)
    }

    pub(crate) fn from_shared(shared: Arc<Shared<P, R>>) -> Self {
        Self { shared }
    }

    /// Appends `(id, payload)` pairs as `pending`, in order.
    ///
    /// Does not start processing. While a drain is running, new items become
    /// eligible in that same cycle; from the completion callback they wait for
    /// [`process_queue`](Self::process_queue). Empty identifiers get a generated one.
    pub fn add_items<K, I>(&self, entries: I) -> AddReport
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<ItemId>,
    {
        let (report, status) = self.shared.mutate(|s| (s.add(entries), s.status()));

        if report.added + report.replaced > 0 {
            self.shared.bus.publish(
                Event::new(EventKind::ItemsAdded)
                    .with_count(report.added)
                    .with_generation(status.generation)
                    .with_progress(status.progress),
            );
        }
        if report.skipped > 0 {
            self.shared.bus.publish(
                Event::new(EventKind::ItemsSkipped)
                    .with_count(report.skipped)
                    .with_generation(status.generation),
            );
        }
        if status.is_processing && report.added > 0 {
            self.shared.wake.notify_waiters();
        }
        report
    }

    /// Starts a drain cycle over all pending items.
    ///
    /// Calling it while a drain is running is a no-op; so is calling it with
    /// nothing pending. Item failures never surface here.
    ///
    /// Called from the completion callback, it starts the next cycle on the
    /// drain task that is delivering the completion, so the queue never
    /// reports idle in between.
    pub fn process_queue(&self) -> ProcessOutcome {
        match self.shared.mutate(|s| s.begin()) {
            Begin::Continued { generation, cycle } => {
                debug!(generation, cycle, "continuing drain after completion");
                self.shared.bus.publish(
                    Event::new(EventKind::DrainStarted)
                        .with_cycle(cycle)
                        .with_generation(generation)
                        .with_progress(self.progress()),
                );
                ProcessOutcome::Started { cycle }
            }
            Begin::Started { generation, cycle } => {
                debug!(generation, cycle, "starting drain");
                self.shared.bus.publish(
                    Event::new(EventKind::DrainStarted)
                        .with_cycle(cycle)
                        .with_generation(generation)
                        .with_progress(self.progress()),
                );
                tokio::spawn(dispatcher::drain(Arc::clone(&self.shared), generation, cycle));
                ProcessOutcome::Started { cycle }
            }
            Begin::AlreadyRunning => {
                self.shared.wake.notify_waiters();
                ProcessOutcome::AlreadyRunning
            }
            Begin::NothingPending => ProcessOutcome::NothingPending,
        }
    }

    /// Re-arms every failed item to `pending`; returns how many.
    ///
    /// Does not start processing, except that re-armed items join a drain
    /// that is already running.
    pub fn retry_failed_items(&self) -> usize {
        let (n, status) = self.shared.mutate(|s| (s.retry_failed(), s.status()));
        self.retried(None, n, status);
        n
    }

    /// Re-arms the failed item(s) with the given identifier; returns how many.
    pub fn retry_item(&self, id: impl Into<ItemId>) -> usize {
        let id = id.into();
        let (n, status) = self.shared.mutate(|s| (s.retry_item(&id), s.status()));
        self.retried(Some(&id), n, status);
        n
    }

    fn retried(&self, id: Option<&ItemId>, n: usize, status: QueueStatus) {
        if n == 0 {
            return;
        }
        let mut ev = Event::new(EventKind::ItemsRetried)
            .with_count(n)
            .with_progress(status.progress);
        if let Some(id) = id {
            ev = ev.with_item(id.shared());
        }
        self.shared.bus.publish(ev);
        if status.is_processing {
            self.shared.wake.notify_waiters();
        }
    }

    /// Deletes every item with the given identifier; returns how many.
    ///
    /// An in-flight call for a removed item still runs, but its result is dropped.
    pub fn remove_item(&self, id: impl Into<ItemId>) -> usize {
        let id = id.into();
        let n = self.shared.mutate(|s| s.remove(&id));
        if n > 0 {
            self.shared.bus.publish(
                Event::new(EventKind::ItemRemoved)
                    .with_item(id.shared())
                    .with_count(n),
            );
            self.shared.wake.notify_waiters();
        }
        n
    }

    /// Drops every item and stops processing.
    ///
    /// Results of calls already in flight are discarded when they arrive, and
    /// the interrupted cycle fires no completion.
    pub fn clear_queue(&self) {
        let (discarded, generation) = self.shared.mutate(|s| (s.clear(), s.generation()));
        debug!(discarded, generation, "queue cleared");
        self.shared.bus.publish(
            Event::new(EventKind::QueueCleared)
                .with_count(discarded)
                .with_generation(generation),
        );
        self.shared.wake.notify_waiters();
    }

    /// Consistent copy of items, flag and counters.
    pub fn snapshot(&self) -> QueueSnapshot<P, R> {
        self.shared.read(|s| s.snapshot())
    }

    /// Copy of the items in insertion order.
    pub fn items(&self) -> Vec<QueueItem<P, R>> {
        self.shared.read(|s| s.items())
    }

    pub fn progress(&self) -> Progress {
        self.shared.read(|s| s.progress())
    }

    /// `true` from a started [`process_queue`](Self::process_queue) until the
    /// cycle's completion (or a clear).
    pub fn is_processing(&self) -> bool {
        self.shared.read(|s| s.is_processing())
    }

    pub fn status(&self) -> QueueStatus {
        self.shared.read(|s| s.status())
    }

    /// Receiver updated after every change; suited for rendering live progress.
    pub fn watch(&self) -> watch::Receiver<QueueStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Resolves once the queue is not processing.
    ///
    /// When a cycle drains, this resolves after its completion callback returned.
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.status_tx.subscribe();
        let _ = rx.wait_for(|s| !s.is_processing).await;
    }

    /// Raw event stream (see [`EventKind`]).
    ///
    /// A receiver more than `bus_capacity` events behind gets `Lagged` and skips ahead.
    pub fn events(&self) -> broadcast::Receiver<Arc<Event>> {
        self.shared.bus.subscribe()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.cfg
    }
}
