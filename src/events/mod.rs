//! Queue events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the store operations, the
//! dispatcher, in-flight settlements and the completion notifier.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - `Bus` and its lag-tolerant `Tap` reader, shared as `Arc<Event>`
//!
//! ## Quick reference
//! - **Publishers**: `BulkQueue` operations, `dispatcher::drain`, settlement tasks,
//!   `Notifier`, the subscriber fan-out (overflow/panic).
//! - **Consumers**: the subscriber fan-out and any receiver obtained from
//!   `BulkQueue::events()`.

mod bus;
mod event;

pub(crate) use bus::{Bus, Tap};
pub use event::{Event, EventKind};

pub(crate) use event::panic_info;
