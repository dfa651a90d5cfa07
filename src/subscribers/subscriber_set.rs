//! # Subscriber fan-out.
//!
//! [`SubscriberSet`] reads the bus through a [`Tap`] and hands each event to
//! every subscriber that [`wants`](Subscribe::wants) it, over one bounded lane
//! and one worker per subscriber.
//!
//! ```text
//! Bus ─► Tap ─► SubscriberSet::run ─┬─► lane "log"   ─► worker ─► on_event
//!                                   ├─► lane "audit" ─► worker ─► on_event
//!                                   └─► ...                └─ panic ─► SubscriberPanicked ─► Bus
//!             lane full / closed ─► SubscriberOverflow ─► Bus
//! ```
//!
//! ## Rules
//! - Per-subscriber FIFO; no ordering across subscribers.
//! - A full lane drops the event for that subscriber only.
//! - Fault events carry the generation and cycle of the event that caused them,
//!   so a dropped `ItemFailed` can be traced to its drain.
//! - A fault while handling a fault event is logged and never published.
//!
//! `on_event` runs under `AssertUnwindSafe`: a subscriber that panics while
//! holding its own lock leaves that lock poisoned.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::{panic_info, Bus, Event, Tap};
use crate::subscribers::Subscribe;

struct Lane {
    sub: Arc<dyn Subscribe>,
    tx: mpsc::Sender<Arc<Event>>,
    dropped: usize,
}

pub(crate) struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Must be called inside a Tokio runtime.
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut lanes = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            workers.push(tokio::spawn(worker(Arc::clone(&sub), rx, bus.clone())));
            lanes.push(Lane { sub, tx, dropped: 0 });
        }
        Self { lanes, workers, bus }
    }

    /// Forwards events until `token` is cancelled, then drains the lanes and stops the workers.
    pub async fn run(mut self, mut tap: Tap, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                ev = tap.recv() => match ev {
                    Some(ev) => self.emit(ev),
                    None => break,
                },
            }
        }
        debug!(lagged = tap.lagged(), "subscriber fan-out stopping");
        self.shutdown().await;
    }

    fn emit(&mut self, event: Arc<Event>) {
        for lane in &mut self.lanes {
            if !lane.sub.wants(event.kind) {
                continue;
            }
            let reason = match lane.tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            lane.dropped += 1;

            let name = lane.sub.name();
            if event.is_subscriber_fault() {
                debug!(subscriber = name, reason, dropped = lane.dropped, "fault event dropped");
                continue;
            }
            self.bus
                .publish(Event::subscriber_overflow(name, &event, reason, lane.dropped));
        }
    }

    async fn shutdown(self) {
        for lane in &self.lanes {
            if lane.dropped > 0 {
                warn!(subscriber = lane.sub.name(), dropped = lane.dropped, "subscriber missed events");
            }
        }
        drop(self.lanes);

        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn worker(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        let Err(panic) = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await else {
            continue;
        };
        let info = panic_info(&*panic);
        if ev.is_subscriber_fault() {
            warn!(subscriber = sub.name(), info = %info, "subscriber panicked on a fault event");
            continue;
        }
        bus.publish(Event::subscriber_panicked(sub.name(), &ev, info));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
        only: Option<EventKind>,
        capacity: Option<usize>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn wants(&self, kind: EventKind) -> bool {
            self.only.map_or(true, |only| only == kind)
        }

        fn name(&self) -> &'static str {
            "recorder"
        }

        fn queue_capacity(&self) -> usize {
            self.capacity.unwrap_or(1024)
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _event: &Event) {
            panic!("exploder always panics");
        }

        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    fn ev(kind: EventKind) -> Arc<Event> {
        Arc::new(Event::new(kind))
    }

    #[tokio::test]
    async fn test_fan_out_in_order() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let mut set = SubscriberSet::new(vec![rec.clone()], bus);

        set.emit(ev(EventKind::ItemsAdded));
        set.emit(ev(EventKind::DrainStarted));
        set.emit(ev(EventKind::DrainCompleted));
        set.shutdown().await;

        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![
                EventKind::ItemsAdded,
                EventKind::DrainStarted,
                EventKind::DrainCompleted
            ]
        );
    }

    #[tokio::test]
    async fn test_filtered_kinds_are_not_delivered() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder {
            only: Some(EventKind::ItemFailed),
            ..Recorder::default()
        });
        let mut set = SubscriberSet::new(vec![rec.clone()], bus);

        set.emit(ev(EventKind::ItemSucceeded));
        set.emit(ev(EventKind::ItemFailed));
        set.emit(ev(EventKind::DrainCompleted));
        set.shutdown().await;

        assert_eq!(*rec.seen.lock().unwrap(), vec![EventKind::ItemFailed]);
    }

    #[tokio::test]
    async fn test_panic_is_isolated_and_stamped() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder::default());
        let mut set = SubscriberSet::new(vec![Arc::new(Exploder), rec.clone()], bus);

        set.emit(Arc::new(
            Event::new(EventKind::ItemFailed)
                .with_item("7981234")
                .with_generation(1)
                .with_cycle(3),
        ));
        set.shutdown().await;

        let fault = rx.recv().await.unwrap();
        assert!(fault.is_subscriber_panic());
        assert_eq!(fault.item.as_deref(), Some("exploder"));
        assert_eq!(
            fault.reason.as_deref(),
            Some("event=item_failed panic=exploder always panics")
        );
        assert_eq!(fault.generation, Some(1));
        assert_eq!(fault.cycle, Some(3));
        assert_eq!(*rec.seen.lock().unwrap(), vec![EventKind::ItemFailed]);
    }

    #[tokio::test]
    async fn test_panic_on_fault_event_is_not_republished() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let mut set = SubscriberSet::new(vec![Arc::new(Exploder)], bus);

        set.emit(ev(EventKind::SubscriberPanicked));
        set.shutdown().await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_overflow_counts_drops_per_subscriber() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder {
            capacity: Some(1),
            ..Recorder::default()
        });
        let mut set = SubscriberSet::new(vec![rec.clone()], bus);

        // Current-thread runtime: the worker cannot drain the lane between emits.
        set.emit(ev(EventKind::ItemDispatched));
        set.emit(Arc::new(Event::new(EventKind::ItemSucceeded).with_cycle(4)));
        set.emit(Arc::new(Event::new(EventKind::ItemFailed).with_cycle(4)));
        set.emit(ev(EventKind::SubscriberOverflow));
        set.shutdown().await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.reason.as_deref(), Some("reason=full event=item_succeeded"));
        assert_eq!(first.count, Some(1));
        assert_eq!(first.cycle, Some(4));
        assert_eq!(second.reason.as_deref(), Some("reason=full event=item_failed"));
        assert_eq!(second.count, Some(2));
        assert!(rx.try_recv().is_err());
        assert_eq!(*rec.seen.lock().unwrap(), vec![EventKind::ItemDispatched]);
    }

    #[tokio::test]
    async fn test_run_forwards_until_cancelled() {
        let bus = Bus::new(16);
        let token = CancellationToken::new();
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone()], bus.clone());
        let handle = tokio::spawn(set.run(bus.tap("subscribers"), token.clone()));

        bus.publish(Event::new(EventKind::DrainStarted));
        for _ in 0..100 {
            if !rec.seen.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        token.cancel();
        handle.await.unwrap();
        assert_eq!(*rec.seen.lock().unwrap(), vec![EventKind::DrainStarted]);
    }
}
