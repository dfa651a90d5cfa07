//! # Drain loop: bounded, paced dispatch of pending items.
//!
//! One [`drain`] task runs per cycle. It owns a [`JoinSet`] of in-flight
//! executor calls and never holds the store lock across an `.await`.
//!
//! ```text
//! loop:
//!   generation changed?            → detach in-flight calls, exit (no completion)
//!   pending && in_flight < max:
//!       pacing deadline ahead?     → wait(deadline | settlement | wake)
//!       else                       → take_next → spawn settle(dispatch)
//!   in_flight > 0                  → wait(settlement | wake)
//!   otherwise                      → fail orphans → finish → Notifier::drained → close
//!       close: restart requested   → next cycle, same task
//!              else                → idle, exit
//! ```
//!
//! ## Rules
//! - At most `max_concurrent` items are `active` at any instant.
//! - Consecutive dispatch starts are at least `delay_between_updates` apart,
//!   across cycles too.
//! - A freed slot is refilled without waiting for the whole batch.
//! - Settlement of a detached call goes through the generation check in the
//!   store and is dropped there.
//! - The queue reports processing until the completion callback has returned.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

use crate::core::queue::Shared;
use crate::core::store::{Close, Dispatch, Finish, Settled, ORPHANED};
use crate::error::ItemError;
use crate::events::{panic_info, Event, EventKind};
use crate::items::{Output, Payload};

pub(crate) async fn drain<P: Payload, R: Output>(shared: Arc<Shared<P, R>>, generation: u64, mut cycle: u64) {
    let max = shared.cfg.max_concurrent;
    let mut in_flight: JoinSet<()> = JoinSet::new();

    debug!(generation, cycle, max_concurrent = max, "drain started");

    loop {
        // Registered before inspecting the store so no wake-up is lost in between.
        let wake = shared.wake.notified();
        tokio::pin!(wake);
        wake.as_mut().enable();

        if shared.read(|s| s.generation()) != generation {
            debug!(generation, cycle, in_flight = in_flight.len(), "drain abandoned by clear");
            in_flight.detach_all();
            return;
        }

        if in_flight.len() < max && shared.read(|s| s.has_pending()) {
            if let Some(ready_at) = shared.next_start().filter(|t| Instant::now() < *t) {
                trace!(cycle, "pacing next dispatch");
                tokio::select! {
                    _ = time::sleep_until(ready_at) => {}
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => reap(joined),
                    _ = &mut wake => {}
                }
                continue;
            }

            if let Some(dispatch) = shared.mutate(|s| s.take_next(generation)) {
                shared.mark_started(Instant::now());
                debug!(cycle, item = %dispatch.id, attempt = dispatch.attempt, "dispatching");
                shared.bus.publish(
                    Event::new(EventKind::ItemDispatched)
                        .with_item(dispatch.id.shared())
                        .with_attempt(dispatch.attempt)
                        .with_generation(generation)
                        .with_cycle(cycle),
                );
                in_flight.spawn(settle(Arc::clone(&shared), dispatch));
            }
            continue;
        }

        if !in_flight.is_empty() {
            tokio::select! {
                Some(joined) = in_flight.join_next() => reap(joined),
                _ = &mut wake => {}
            }
            continue;
        }

        fail_orphans(&shared, generation, cycle);

        match shared.mutate(|s| s.finish(generation)) {
            Finish::Drained(snapshot) => {
                debug!(
                    generation,
                    cycle,
                    success = snapshot.progress.success,
                    error = snapshot.progress.error,
                    "drain completed"
                );
                shared.notifier.drained(&snapshot);
            }
            Finish::Busy => continue,
            Finish::Stale => return,
        }

        match shared.mutate(|s| s.close(generation)) {
            Close::Restart { cycle: next } => {
                debug!(generation, cycle = next, "drain restarted from completion");
                cycle = next;
            }
            Close::Idle | Close::Stale => return,
        }
    }
}

fn reap(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        warn!(error = %err, "settlement task ended abnormally");
    }
}

/// Fails items left `Active` by a settlement task that died before writing back.
fn fail_orphans<P: Payload, R: Output>(shared: &Shared<P, R>, generation: u64, cycle: u64) {
    let (orphans, progress) = shared.mutate(|s| (s.fail_orphaned(generation), s.progress()));
    for orphan in orphans {
        warn!(item = %orphan.id, attempt = orphan.attempt, "failing orphaned item");
        shared.bus.publish(
            Event::new(EventKind::ItemFailed)
                .with_item(orphan.id.shared())
                .with_attempt(orphan.attempt)
                .with_reason(ORPHANED)
                .with_progress(progress)
                .with_generation(generation)
                .with_cycle(cycle),
        );
    }
}

/// Runs one executor call and writes its outcome back to the store.
async fn settle<P: Payload, R: Output>(shared: Arc<Shared<P, R>>, dispatch: Dispatch<P>) {
    let Dispatch {
        key,
        id,
        payload,
        generation,
        ..
    } = dispatch;

    let executor = Arc::clone(&shared.executor);
    let call_id = id.clone();
    let call = async move { executor.execute(call_id, payload).await };

    let outcome = match AssertUnwindSafe(call).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(ItemError::Panicked {
            info: panic_info(&*panic),
        }),
    };

    let event = match shared.mutate(|s| s.settle(generation, key, outcome)) {
        Settled::Succeeded { attempt, progress } => {
            debug!(item = %id, attempt, "item succeeded");
            Event::new(EventKind::ItemSucceeded)
                .with_attempt(attempt)
                .with_progress(progress)
        }
        Settled::Failed {
            attempt,
            message,
            progress,
        } => {
            debug!(item = %id, attempt, error = %message, "item failed");
            Event::new(EventKind::ItemFailed)
                .with_attempt(attempt)
                .with_reason(message)
                .with_progress(progress)
        }
        Settled::Stale => {
            debug!(item = %id, generation, "dropping stale result");
            Event::new(EventKind::StaleResultDropped)
        }
    };
    shared
        .bus
        .publish(event.with_item(id.shared()).with_generation(generation));
}
