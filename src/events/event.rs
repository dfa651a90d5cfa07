//! # Queue events emitted by the store, dispatcher and notifier.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Store events**: items appended, skipped, retried, removed, cleared
//! - **Dispatch events**: per-item flow (dispatched, succeeded, failed, stale)
//! - **Cycle events**: drain start/completion, callback and subscriber faults
//!
//! The [`Event`] struct carries additional metadata such as timestamps, item id,
//! reasons, counts and a progress snapshot.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use bulkvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ItemFailed)
//!     .with_item("7981234")
//!     .with_reason("HTTP 429")
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, EventKind::ItemFailed);
//! assert_eq!(ev.item.as_deref(), Some("7981234"));
//! assert_eq!(ev.reason.as_deref(), Some("HTTP 429"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::progress::Progress;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Store events ===
    /// Items were appended as `pending` (or replaced a pending payload).
    ///
    /// Sets:
    /// - `count`: number of new items
    /// - `generation`: store generation
    /// - `progress`: counters after the append
    ItemsAdded,

    /// Payloads dropped by [`AdmissionPolicy::Skip`](crate::AdmissionPolicy::Skip).
    ///
    /// Sets:
    /// - `count`: number of skipped payloads
    /// - `generation`: store generation
    ItemsSkipped,

    /// Failed items were re-armed to `pending`.
    ///
    /// Sets:
    /// - `item`: identifier when a single item was retried
    /// - `count`: number of re-armed items
    /// - `progress`: counters after the retry
    ItemsRetried,

    /// Items were removed by identifier.
    ///
    /// Sets:
    /// - `item`: identifier
    /// - `count`: number of removed items
    ItemRemoved,

    /// The queue was cleared; a new generation begins.
    ///
    /// Sets:
    /// - `count`: number of discarded items
    /// - `generation`: the **new** generation
    QueueCleared,

    // === Dispatch events ===
    /// Item moved `pending → active`; the executor was invoked.
    ///
    /// Sets:
    /// - `item`: identifier
    /// - `attempt`: dispatch count for this item (1-based)
    /// - `generation`, `cycle`
    ItemDispatched,

    /// Executor resolved; item is `success`.
    ///
    /// Sets:
    /// - `item`, `attempt`, `generation`
    /// - `progress`: counters after the settlement
    ItemSucceeded,

    /// Executor rejected or panicked; item is `error`.
    ///
    /// Sets:
    /// - `item`, `attempt`, `generation`
    /// - `reason`: failure message
    /// - `progress`: counters after the settlement
    ItemFailed,

    /// An executor result arrived for an item that no longer exists
    /// (cleared or removed) and was discarded.
    ///
    /// Sets:
    /// - `item`: identifier
    /// - `generation`: generation the call was dispatched in
    StaleResultDropped,

    // === Cycle events ===
    /// A drain cycle started.
    ///
    /// Sets:
    /// - `cycle`, `generation`
    /// - `progress`: counters at start
    DrainStarted,

    /// A drain cycle finished; published once per cycle.
    ///
    /// Sets:
    /// - `cycle`, `generation`
    /// - `progress`: final counters
    DrainCompleted,

    /// The completion callback panicked (the cycle still counts as completed).
    ///
    /// Sets:
    /// - `cycle`
    /// - `reason`: panic info
    CallbackPanicked,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `item`: subscriber name
    /// - `reason`: `event=<kind> panic=<info>`
    /// - `generation`, `cycle`: copied from the event being handled
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `item`: subscriber name
    /// - `reason`: `reason=<full|closed> event=<kind>`
    /// - `count`: events dropped for this subscriber so far
    /// - `generation`, `cycle`: copied from the dropped event
    SubscriberOverflow,
}

impl EventKind {
    /// Stable snake_case name, used in fault reasons and logs.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::ItemsAdded => "items_added",
            EventKind::ItemsSkipped => "items_skipped",
            EventKind::ItemsRetried => "items_retried",
            EventKind::ItemRemoved => "item_removed",
            EventKind::QueueCleared => "queue_cleared",
            EventKind::ItemDispatched => "item_dispatched",
            EventKind::ItemSucceeded => "item_succeeded",
            EventKind::ItemFailed => "item_failed",
            EventKind::StaleResultDropped => "stale_result_dropped",
            EventKind::DrainStarted => "drain_started",
            EventKind::DrainCompleted => "drain_completed",
            EventKind::CallbackPanicked => "callback_panicked",
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriberOverflow => "subscriber_overflow",
        }
    }
}

/// Queue event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Item identifier (or subscriber name for subscriber events).
    pub item: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Dispatch count of the item (starting from 1).
    pub attempt: Option<u32>,
    /// Number of items affected.
    pub count: Option<usize>,
    /// Store generation the event belongs to.
    pub generation: Option<u64>,
    /// Drain cycle the event belongs to.
    pub cycle: Option<u64>,
    /// Counters at the time of the event.
    pub progress: Option<Progress>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            item: None,
            reason: None,
            attempt: None,
            count: None,
            generation: None,
            cycle: None,
            progress: None,
        }
    }

    /// Attaches an item identifier.
    #[inline]
    pub fn with_item(mut self, item: impl Into<Arc<str>>) -> Self {
        self.item = Some(item.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches an item count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Attaches a store generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a drain cycle.
    #[inline]
    pub fn with_cycle(mut self, cycle: u64) -> Self {
        self.cycle = Some(cycle);
        self
    }

    /// Attaches a progress snapshot.
    #[inline]
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Creates an overflow event for `subscriber` dropping `dropped_event`.
    pub(crate) fn subscriber_overflow(
        subscriber: &'static str,
        dropped_event: &Event,
        reason: &'static str,
        dropped_total: usize,
    ) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_item(subscriber)
            .with_reason(format!(
                "reason={reason} event={}",
                dropped_event.kind.as_label()
            ))
            .with_count(dropped_total)
            .caused_by(dropped_event)
    }

    /// Creates a panic event for `subscriber` failing on `handled`.
    pub(crate) fn subscriber_panicked(subscriber: &'static str, handled: &Event, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_item(subscriber)
            .with_reason(format!("event={} panic={info}", handled.kind.as_label()))
            .caused_by(handled)
    }

    /// Places a fault event in the generation and cycle of its cause.
    fn caused_by(mut self, cause: &Event) -> Self {
        self.generation = cause.generation;
        self.cycle = cause.cycle;
        self
    }

    /// `true` for events reporting a subscriber fault.
    #[inline]
    pub fn is_subscriber_fault(&self) -> bool {
        self.is_subscriber_overflow() || self.is_subscriber_panic()
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::ItemsAdded);
        let b = Event::new(EventKind::ItemsAdded);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_overflow_is_stamped_with_dropped_event_cycle() {
        let dropped = Event::new(EventKind::ItemSucceeded)
            .with_item("7981234")
            .with_generation(2)
            .with_cycle(5);
        let ev = Event::subscriber_overflow("metrics", &dropped, "full", 7);

        assert!(ev.is_subscriber_overflow());
        assert!(ev.is_subscriber_fault());
        assert_eq!(ev.item.as_deref(), Some("metrics"));
        assert_eq!(ev.reason.as_deref(), Some("reason=full event=item_succeeded"));
        assert_eq!(ev.count, Some(7));
        assert_eq!(ev.generation, Some(2));
        assert_eq!(ev.cycle, Some(5));
        assert!(ev.seq > dropped.seq);
    }

    #[test]
    fn test_panic_names_handled_event() {
        let handled = Event::new(EventKind::DrainCompleted).with_cycle(1);
        let ev = Event::subscriber_panicked("audit", &handled, "disk full".into());
        assert!(ev.is_subscriber_panic());
        assert_eq!(ev.reason.as_deref(), Some("event=drain_completed panic=disk full"));
        assert_eq!(ev.cycle, Some(1));
        assert_eq!(ev.generation, None);
    }

    #[test]
    fn test_panic_info() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_info(&*boxed), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_info(&*boxed), "bang");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_info(&*boxed), "unknown panic");
    }
}
