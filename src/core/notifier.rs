//! Drain-completion delivery.
//!
//! Publishes [`EventKind::DrainCompleted`] and invokes the user callback at
//! most once per cycle. Called by the dispatcher after the store lock is
//! released, so the callback may freely call back into the queue.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::events::{panic_info, Bus, Event, EventKind};
use crate::items::QueueSnapshot;

/// Completion callback invoked with the final snapshot of a drain cycle.
pub type CompletionFn<P, R> = Arc<dyn Fn(&QueueSnapshot<P, R>) + Send + Sync + 'static>;

pub(crate) struct Notifier<P, R> {
    callback: Option<CompletionFn<P, R>>,
    bus: Bus,
}

impl<P, R> Notifier<P, R> {
    pub(crate) fn new(callback: Option<CompletionFn<P, R>>, bus: Bus) -> Self {
        Self { callback, bus }
    }

    pub(crate) fn drained(&self, snapshot: &QueueSnapshot<P, R>) {
        self.bus.publish(
            Event::new(EventKind::DrainCompleted)
                .with_cycle(snapshot.cycle)
                .with_generation(snapshot.generation)
                .with_progress(snapshot.progress),
        );

        let Some(callback) = &self.callback else {
            return;
        };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(snapshot))) {
            let info = panic_info(&*panic);
            error!(cycle = snapshot.cycle, %info, "completion callback panicked");
            self.bus.publish(
                Event::new(EventKind::CallbackPanicked)
                    .with_cycle(snapshot.cycle)
                    .with_reason(info),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Progress;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot() -> QueueSnapshot<u8, u8> {
        QueueSnapshot {
            items: Vec::new(),
            is_processing: false,
            progress: Progress::default(),
            generation: 0,
            cycle: 3,
        }
    }

    #[tokio::test]
    async fn test_callback_runs_after_event() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let cb: CompletionFn<u8, u8> = Arc::new(move |snap: &QueueSnapshot<u8, u8>| {
            assert_eq!(snap.cycle, 3);
            c.fetch_add(1, Ordering::SeqCst);
        });

        Notifier::new(Some(cb), bus).drained(&snapshot());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::DrainCompleted);
        assert_eq!(ev.cycle, Some(3));
    }

    #[tokio::test]
    async fn test_callback_panic_is_contained() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let cb: CompletionFn<u8, u8> = Arc::new(|_: &QueueSnapshot<u8, u8>| panic!("toast failed"));

        Notifier::new(Some(cb), bus).drained(&snapshot());

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::DrainCompleted);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::CallbackPanicked);
        assert_eq!(ev.reason.as_deref(), Some("toast failed"));
    }
}
