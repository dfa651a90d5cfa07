//! # Progress aggregation.
//!
//! [`Progress`] is derived from the item list on demand; it is never stored
//! next to the items, so it cannot drift from them.
//!
//! ## Rules
//! - `completed = success + error`
//! - `pending + active + success + error = total`
//! - `completed = total` exactly when nothing is pending or active

use crate::items::{ItemStatus, QueueItem};

/// Aggregate counters over one queue snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    /// Number of items in the queue.
    pub total: usize,
    /// Items that settled successfully.
    pub success: usize,
    /// Items that settled with an error.
    pub error: usize,
    /// `success + error`.
    pub completed: usize,
    /// Items waiting for dispatch.
    pub pending: usize,
    /// Items whose executor call is in flight.
    pub active: usize,
}

impl Progress {
    /// Counts item statuses in one pass.
    pub fn from_items<P, R>(items: &[QueueItem<P, R>]) -> Self {
        let mut p = Progress {
            total: items.len(),
            ..Progress::default()
        };
        for item in items {
            match item.status() {
                ItemStatus::Pending => p.pending += 1,
                ItemStatus::Active => p.active += 1,
                ItemStatus::Success => p.success += 1,
                ItemStatus::Error => p.error += 1,
            }
        }
        p.completed = p.success + p.error;
        p
    }

    /// Completion percentage in `0.0..=100.0` (`0.0` for an empty queue).
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }

    /// `true` if at least one item failed.
    #[inline]
    pub fn has_errors(&self) -> bool {
        self.error > 0
    }

    /// `true` when every item has settled (vacuously true for an empty queue).
    #[inline]
    pub fn is_drained(&self) -> bool {
        self.completed == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{ItemId, ItemState};

    fn item(key: u64, state: ItemState<u32>) -> QueueItem<(), u32> {
        let mut it = QueueItem::pending(key, ItemId::from(key), ());
        it.state = state;
        it
    }

    #[test]
    fn test_counts_and_conservation() {
        let items = vec![
            item(1, ItemState::Pending),
            item(2, ItemState::Active),
            item(3, ItemState::Success(7)),
            item(4, ItemState::Error("HTTP 422".into())),
            item(5, ItemState::Success(8)),
        ];
        let p = Progress::from_items(&items);
        assert_eq!(p.total, 5);
        assert_eq!(p.success, 2);
        assert_eq!(p.error, 1);
        assert_eq!(p.completed, 3);
        assert_eq!(p.pending + p.active + p.success + p.error, p.total);
        assert!(!p.is_drained());
        assert!(p.has_errors());
        assert!((p.percent() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_queue() {
        let p = Progress::from_items::<(), u32>(&[]);
        assert_eq!(p, Progress::default());
        assert!(p.is_drained());
        assert_eq!(p.percent(), 0.0);
    }
}
