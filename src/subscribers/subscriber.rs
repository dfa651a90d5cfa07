//! # Queue event subscriber.
//!
//! [`Subscribe`] is how per-item hooks are attached to a queue: react to
//! `ItemSucceeded` / `ItemFailed` to invalidate a cache entry, write an audit
//! row, or bump a counter. It also receives the cycle events
//! (`DrainStarted`, `DrainCompleted`).
//!
//! A subscriber runs on its own worker behind a bounded lane, so a slow one
//! delays only itself. [`wants`](Subscribe::wants) filters events before they
//! take up lane capacity.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use bulkvisor::{Event, EventKind, Subscribe};
//!
//! struct FailureAudit;
//!
//! #[async_trait]
//! impl Subscribe for FailureAudit {
//!     async fn on_event(&self, ev: &Event) {
//!         // write ev.item / ev.attempt / ev.reason to the audit log
//!         let _ = (&ev.item, ev.attempt, &ev.reason);
//!     }
//!
//!     fn wants(&self, kind: EventKind) -> bool {
//!         kind == EventKind::ItemFailed
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-audit" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Receives queue events on a dedicated worker.
///
/// A panic in [`on_event`](Self::on_event) is caught and published as
/// [`SubscriberPanicked`](EventKind::SubscriberPanicked); the worker keeps
/// serving later events.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Events arrive in publish order.
    async fn on_event(&self, event: &Event);

    /// Whether events of `kind` should be delivered at all. Default: every kind.
    ///
    /// Filtered events never count against the lane and never overflow.
    fn wants(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }

    /// Name used in logs and in overflow/panic events.
    ///
    /// Defaults to `type_name::<Self>()`.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before new ones are dropped (min 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
