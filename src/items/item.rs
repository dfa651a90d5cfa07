//! # Queue items and their state machine.
//!
//! ```text
//! add_items ──► Pending ──dispatch──► Active ──settle──► Success(result)
//!                  ▲                                 └──► Error(message)
//!                  └────────── retry (error only) ◄───────────┘
//! ```
//!
//! The outcome is stored inside the state, so `result` exists only for
//! `Success` and `error` only for `Error`.

use crate::items::ItemId;

/// Marker for payload types the queue can carry.
///
/// Blanket-implemented; payloads are cloned into every dispatch and snapshot.
pub trait Payload: Clone + Send + Sync + 'static {}
impl<T: Clone + Send + Sync + 'static> Payload for T {}

/// Marker for executor result types.
pub trait Output: Clone + Send + Sync + 'static {}
impl<T: Clone + Send + Sync + 'static> Output for T {}

/// Flat status of an item, as shown to a UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    /// Waiting for a free slot.
    Pending,
    /// Executor call in flight.
    Active,
    /// Executor resolved.
    Success,
    /// Executor rejected or panicked.
    Error,
}

impl ItemStatus {
    /// Returns a short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Active => "active",
            ItemStatus::Success => "success",
            ItemStatus::Error => "error",
        }
    }

    /// `true` for `Success` and `Error`.
    #[inline]
    pub fn is_settled(&self) -> bool {
        matches!(self, ItemStatus::Success | ItemStatus::Error)
    }

    /// `true` for `Pending` and `Active`.
    #[inline]
    pub fn is_unsettled(&self) -> bool {
        !self.is_settled()
    }
}

#[derive(Clone, Debug)]
pub(crate) enum ItemState<R> {
    Pending,
    Active,
    Success(R),
    Error(String),
}

/// One unit of work: a single downstream update.
#[derive(Clone, Debug)]
pub struct QueueItem<P, R> {
    /// Store-internal key, unique per queue instance; survives payload replacement.
    pub(crate) key: u64,
    pub(crate) id: ItemId,
    pub(crate) payload: P,
    pub(crate) state: ItemState<R>,
    pub(crate) attempts: u32,
}

impl<P, R> QueueItem<P, R> {
    pub(crate) fn pending(key: u64, id: ItemId, payload: P) -> Self {
        Self {
            key,
            id,
            payload,
            state: ItemState::Pending,
            attempts: 0,
        }
    }

    /// Business identifier of the record being updated.
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Caller-supplied payload, exactly as it was appended.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Current status.
    pub fn status(&self) -> ItemStatus {
        match self.state {
            ItemState::Pending => ItemStatus::Pending,
            ItemState::Active => ItemStatus::Active,
            ItemState::Success(_) => ItemStatus::Success,
            ItemState::Error(_) => ItemStatus::Error,
        }
    }

    /// Executor result; `Some` only when the status is `Success`.
    pub fn result(&self) -> Option<&R> {
        match &self.state {
            ItemState::Success(r) => Some(r),
            _ => None,
        }
    }

    /// Failure message; `Some` only when the status is `Error`.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ItemState::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Number of times this item has been dispatched.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
