//! # Queue event bus.
//!
//! [`Bus`] carries every [`Event`] the queue produces to two kinds of reader:
//! the caller's [`BulkQueue::events`](crate::BulkQueue::events) receivers and
//! the internal [`Tap`] that feeds the subscriber fan-out.
//!
//! ```text
//!   BulkQueue ops ──┐
//!   drain task    ──┼──► Bus ──┬──► Tap ──► SubscriberSet::run
//!   settlements   ──┤          └──► BulkQueue::events() receivers
//!   Notifier      ──┘
//! ```
//!
//! ## Rules
//! - `publish` never blocks, and allocates nothing when nobody is listening.
//! - Events are shared as `Arc<Event>`; fan-out never deep-copies them.
//! - A reader that falls more than `bus_capacity` events behind loses the
//!   oldest ones. A [`Tap`] logs the gap and keeps reading.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use super::event::Event;

#[derive(Clone, Debug)]
pub(crate) struct Bus {
    tx: broadcast::Sender<Arc<Event>>,
}

impl Bus {
    /// Creates a bus holding at most `capacity` unread events (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, ev: Event) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        let _ = self.tx.send(Arc::new(ev));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Event>> {
        self.tx.subscribe()
    }

    /// Opens a lag-tolerant reader for an internal consumer.
    pub fn tap(&self, reader: &'static str) -> Tap {
        Tap {
            reader,
            rx: self.tx.subscribe(),
            lagged: 0,
        }
    }
}

/// Bus reader that skips over lost events instead of failing.
pub(crate) struct Tap {
    reader: &'static str,
    rx: broadcast::Receiver<Arc<Event>>,
    lagged: u64,
}

impl Tap {
    /// Next event, or `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.rx.recv().await {
                Ok(ev) => return Some(ev),
                Err(RecvError::Lagged(skipped)) => {
                    self.lagged += skipped;
                    warn!(
                        reader = self.reader,
                        skipped,
                        total = self.lagged,
                        "event reader lagged behind the bus"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Events lost to lag so far.
    pub fn lagged(&self) -> u64 {
        self.lagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_publish_reaches_every_reader() {
        let bus = Bus::new(4);
        let mut rx = bus.subscribe();
        let mut tap = bus.tap("test");
        bus.publish(Event::new(EventKind::QueueCleared).with_count(3));

        let a = rx.recv().await.unwrap();
        let b = tap.recv().await.unwrap();
        assert_eq!(a.count, Some(3));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_publish_without_readers_is_noop() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ItemsAdded));
    }

    #[tokio::test]
    async fn test_tap_skips_lost_events() {
        let bus = Bus::new(2);
        let mut tap = bus.tap("test");
        for n in 0..5 {
            bus.publish(Event::new(EventKind::ItemsAdded).with_count(n));
        }

        let ev = tap.recv().await.unwrap();
        assert_eq!(ev.count, Some(3));
        assert_eq!(tap.lagged(), 3);
        assert_eq!(tap.recv().await.unwrap().count, Some(4));
    }

    #[tokio::test]
    async fn test_tap_ends_when_bus_dropped() {
        let bus = Bus::new(2);
        let mut tap = bus.tap("test");
        drop(bus);
        assert!(tap.recv().await.is_none());
    }
}
