//! By-value views of the queue.
//!
//! Nothing here borrows the store: a snapshot is a clone taken under the
//! store lock, so holding one never blocks or corrupts the scheduler.

use crate::items::{ItemId, ItemStatus, QueueItem};
use crate::progress::Progress;

/// Full copy of the queue at one instant.
#[derive(Clone, Debug)]
pub struct QueueSnapshot<P, R> {
    /// Items in insertion order.
    pub items: Vec<QueueItem<P, R>>,
    /// Whether a drain is running.
    pub is_processing: bool,
    /// Counters derived from `items`.
    pub progress: Progress,
    /// Store generation (bumped by every clear).
    pub generation: u64,
    /// Last drain cycle started on this queue (`0` before the first run).
    pub cycle: u64,
}

impl<P, R> QueueSnapshot<P, R> {
    /// Iterates over items with the given status.
    pub fn with_status(&self, status: ItemStatus) -> impl Iterator<Item = &QueueItem<P, R>> {
        self.items.iter().filter(move |it| it.status() == status)
    }

    /// Identifiers of every failed item, in insertion order.
    pub fn failed_ids(&self) -> Vec<ItemId> {
        self.with_status(ItemStatus::Error)
            .map(|it| it.id().clone())
            .collect()
    }

    /// Looks up the first item with the given identifier.
    pub fn get(&self, id: &str) -> Option<&QueueItem<P, R>> {
        self.items.iter().find(|it| it.id().as_str() == id)
    }
}

/// Lightweight status published on every change (see [`BulkQueue::watch`](crate::BulkQueue::watch)).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStatus {
    /// Counters at the time of the change.
    pub progress: Progress,
    /// Whether a drain is running.
    pub is_processing: bool,
    /// Store generation.
    pub generation: u64,
}
