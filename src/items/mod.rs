//! # Queue items and read snapshots.
//!
//! - [`ItemId`] business identifier (normalised, cheap to clone)
//! - [`QueueItem`] one unit of work with its status and outcome
//! - [`QueueSnapshot`] immutable by-value view handed to UIs and callbacks
//! - [`Payload`], [`Output`] marker bounds for the queue's generic parameters

mod id;
mod item;
mod snapshot;

pub use id::ItemId;
pub use item::{ItemStatus, Output, Payload, QueueItem};
pub use snapshot::{QueueSnapshot, QueueStatus};

pub(crate) use item::ItemState;
