//! # Queue item store.
//!
//! [`QueueStore`] is the single source of truth for item existence and status.
//! Every operation is a plain synchronous method: the owner wraps the store in
//! a mutex and never holds it across an `.await`, so each operation is applied
//! atomically with respect to the others and no half-written state is observable.
//!
//! ## Generations
//! ```text
//! generation 0: add ─► begin ─► take_next ─► settle ─► ... ─► finish ─► close
//!                                   │
//!                               clear() ──► generation 1 (items = [], processing = false)
//!                                   │
//!   in-flight calls tagged gen 0 ───┴──► settle(gen 0, ..) → Stale (dropped)
//! ```
//!
//! ## Rules
//! - Items settle only out of `Active`, and only in the generation that dispatched them.
//! - `processing` is set by [`begin`](QueueStore::begin) and cleared by
//!   [`close`](QueueStore::close) or [`clear`](QueueStore::clear); nothing else touches it.
//! - Between `finish` and `close` the cycle is *closing*: the completion callback
//!   runs, nothing is dispatched, and a `begin` re-opens the same drain task.
//! - Item keys are never reused, so a removed item's late result cannot land on a newcomer.

use crate::error::ItemError;
use crate::items::{ItemId, ItemState, ItemStatus, QueueItem, QueueSnapshot, QueueStatus};
use crate::policies::AdmissionPolicy;
use crate::progress::Progress;

/// Outcome of one [`add_items`](crate::BulkQueue::add_items) call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Items appended as `pending`.
    pub added: usize,
    /// Pending items whose payload was overwritten ([`AdmissionPolicy::Replace`]).
    pub replaced: usize,
    /// Payloads dropped as duplicates ([`AdmissionPolicy::Skip`]).
    pub skipped: usize,
}

/// One item moved to `Active`, ready to hand to the executor.
pub(crate) struct Dispatch<P> {
    pub key: u64,
    pub id: ItemId,
    pub payload: P,
    pub generation: u64,
    pub attempt: u32,
}

/// Result of trying to start a drain cycle.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Begin {
    Started { generation: u64, cycle: u64 },
    /// Requested while the previous cycle is closing; its drain task runs this one.
    Continued { generation: u64, cycle: u64 },
    AlreadyRunning,
    NothingPending,
}

/// Result of recording an executor outcome.
#[derive(Debug)]
pub(crate) enum Settled {
    Succeeded { attempt: u32, progress: Progress },
    Failed { attempt: u32, message: String, progress: Progress },
    Stale,
}

/// Result of trying to finish a drain cycle.
pub(crate) enum Finish<P, R> {
    Drained(QueueSnapshot<P, R>),
    Busy,
    Stale,
}

/// Result of closing a finished cycle once its completion has been delivered.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Close {
    Idle,
    Restart { cycle: u64 },
    Stale,
}

/// An `Active` item whose settlement task ended without writing a result.
#[derive(Debug)]
pub(crate) struct Orphan {
    pub id: ItemId,
    pub attempt: u32,
}

pub(crate) const ORPHANED: &str = "settlement task ended without a result";

pub(crate) struct QueueStore<P, R> {
    items: Vec<QueueItem<P, R>>,
    admission: AdmissionPolicy,
    generation: u64,
    cycle: u64,
    processing: bool,
    closing: bool,
    rerun: bool,
    next_key: u64,
}

impl<P: Clone, R: Clone> QueueStore<P, R> {
    pub fn new(admission: AdmissionPolicy) -> Self {
        Self {
            items: Vec::new(),
            admission,
            generation: 0,
            cycle: 0,
            processing: false,
            closing: false,
            rerun: false,
            next_key: 0,
        }
    }

    /// Appends payloads as `pending`, applying the admission policy.
    pub fn add<K, I>(&mut self, entries: I) -> AddReport
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<ItemId>,
    {
        let mut report = AddReport::default();

        for (id, payload) in entries {
            let key = self.next_key;
            self.next_key += 1;

            let mut id: ItemId = id.into();
            if id.is_empty() {
                id = ItemId::generated(key);
            } else {
                match self.admission {
                    AdmissionPolicy::Skip => {
                        if self.is_queued(&id) {
                            report.skipped += 1;
                            continue;
                        }
                    }
                    AdmissionPolicy::Replace => {
                        let pending = self
                            .items
                            .iter_mut()
                            .find(|it| it.id == id && matches!(it.state, ItemState::Pending));
                        if let Some(item) = pending {
                            item.payload = payload;
                            report.replaced += 1;
                            continue;
                        }
                    }
                    AdmissionPolicy::Allow => {}
                }
            }
            self.items.push(QueueItem::pending(key, id, payload));
            report.added += 1;
        }
        report
    }

    /// Opens a drain cycle if there is pending work and none is running.
    pub fn begin(&mut self) -> Begin {
        if self.processing && !(self.closing && !self.rerun) {
            return Begin::AlreadyRunning;
        }
        if !self.has_pending() {
            return Begin::NothingPending;
        }
        if self.closing {
            self.rerun = true;
            self.cycle += 1;
            return Begin::Continued {
                generation: self.generation,
                cycle: self.cycle,
            };
        }
        self.processing = true;
        self.cycle += 1;
        Begin::Started {
            generation: self.generation,
            cycle: self.cycle,
        }
    }

    /// Marks the first pending item (insertion order) as active.
    pub fn take_next(&mut self, generation: u64) -> Option<Dispatch<P>> {
        if generation != self.generation || !self.processing || self.closing {
            return None;
        }
        let item = self
            .items
            .iter_mut()
            .find(|it| matches!(it.state, ItemState::Pending))?;

        item.state = ItemState::Active;
        item.attempts += 1;
        Some(Dispatch {
            key: item.key,
            id: item.id.clone(),
            payload: item.payload.clone(),
            generation,
            attempt: item.attempts,
        })
    }

    /// Writes an executor outcome back, unless the item is gone or the generation moved on.
    pub fn settle(&mut self, generation: u64, key: u64, outcome: Result<R, ItemError>) -> Settled {
        if generation != self.generation {
            return Settled::Stale;
        }
        let Some(item) = self
            .items
            .iter_mut()
            .find(|it| it.key == key && matches!(it.state, ItemState::Active))
        else {
            return Settled::Stale;
        };

        let attempt = item.attempts;
        match outcome {
            Ok(result) => {
                item.state = ItemState::Success(result);
                Settled::Succeeded {
                    attempt,
                    progress: self.progress(),
                }
            }
            Err(err) => {
                let message = err.as_message();
                item.state = ItemState::Error(message.clone());
                Settled::Failed {
                    attempt,
                    message,
                    progress: self.progress(),
                }
            }
        }
    }

    /// Moves the cycle to closing if nothing is pending or active.
    ///
    /// The returned snapshot is the drained view handed to the completion
    /// callback, so it reports `is_processing == false` even though the queue
    /// stays processing until [`close`](Self::close).
    pub fn finish(&mut self, generation: u64) -> Finish<P, R> {
        if generation != self.generation || !self.processing || self.closing {
            return Finish::Stale;
        }
        if self.items.iter().any(|it| it.status().is_unsettled()) {
            return Finish::Busy;
        }
        self.closing = true;
        let mut snapshot = self.snapshot();
        snapshot.is_processing = false;
        Finish::Drained(snapshot)
    }

    /// Ends a closing cycle: goes idle, or re-opens it if `begin` was called meanwhile.
    pub fn close(&mut self, generation: u64) -> Close {
        if generation != self.generation || !self.closing {
            return Close::Stale;
        }
        self.closing = false;
        if std::mem::take(&mut self.rerun) {
            return Close::Restart { cycle: self.cycle };
        }
        self.processing = false;
        Close::Idle
    }

    /// Fails every `Active` item; called once no settlement task is left to write them.
    pub fn fail_orphaned(&mut self, generation: u64) -> Vec<Orphan> {
        if generation != self.generation {
            return Vec::new();
        }
        self.items
            .iter_mut()
            .filter(|it| matches!(it.state, ItemState::Active))
            .map(|item| {
                item.state = ItemState::Error(ORPHANED.to_string());
                Orphan {
                    id: item.id.clone(),
                    attempt: item.attempts,
                }
            })
            .collect()
    }

    /// Re-arms every failed item; returns how many.
    pub fn retry_failed(&mut self) -> usize {
        self.rearm(|_| true)
    }

    /// Re-arms failed items with the given identifier; returns how many.
    pub fn retry_item(&mut self, id: &ItemId) -> usize {
        self.rearm(|it| it.id == *id)
    }

    fn rearm(&mut self, mut select: impl FnMut(&QueueItem<P, R>) -> bool) -> usize {
        let mut n = 0;
        for item in self.items.iter_mut() {
            if matches!(item.state, ItemState::Error(_)) && select(item) {
                item.state = ItemState::Pending;
                n += 1;
            }
        }
        n
    }

    /// Deletes every item with the given identifier; returns how many.
    pub fn remove(&mut self, id: &ItemId) -> usize {
        let before = self.items.len();
        self.items.retain(|it| it.id != *id);
        before - self.items.len()
    }

    /// Drops all items, stops processing and starts a new generation.
    ///
    /// Returns the number of discarded items.
    pub fn clear(&mut self) -> usize {
        let discarded = self.items.len();
        self.items.clear();
        self.processing = false;
        self.closing = false;
        self.rerun = false;
        self.generation += 1;
        discarded
    }

    fn is_queued(&self, id: &ItemId) -> bool {
        self.items
            .iter()
            .any(|it| it.id == *id && it.status().is_unsettled())
    }

    pub fn has_pending(&self) -> bool {
        self.items
            .iter()
            .any(|it| it.status() == ItemStatus::Pending)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn progress(&self) -> Progress {
        Progress::from_items(&self.items)
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            progress: self.progress(),
            is_processing: self.processing,
            generation: self.generation,
        }
    }

    pub fn items(&self) -> Vec<QueueItem<P, R>> {
        self.items.clone()
    }

    pub fn snapshot(&self) -> QueueSnapshot<P, R> {
        QueueSnapshot {
            items: self.items.clone(),
            is_processing: self.processing,
            progress: self.progress(),
            generation: self.generation,
            cycle: self.cycle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Store = QueueStore<u32, &'static str>;

    fn store_with(policy: AdmissionPolicy, ids: &[&str]) -> Store {
        let mut s = Store::new(policy);
        s.add(ids.iter().enumerate().map(|(i, id)| (*id, i as u32)));
        s
    }

    fn statuses(s: &Store) -> Vec<ItemStatus> {
        s.items().iter().map(|it| it.status()).collect()
    }

    fn started(s: &mut Store) -> u64 {
        match s.begin() {
            Begin::Started { generation, .. } => generation,
            other => panic!("expected Started, got {other:?}"),
        }
    }

    #[test]
    fn test_add_does_not_start_processing() {
        let s = store_with(AdmissionPolicy::Allow, &["a", "b"]);
        assert!(!s.is_processing());
        assert_eq!(statuses(&s), vec![ItemStatus::Pending, ItemStatus::Pending]);
    }

    #[test]
    fn test_take_next_follows_insertion_order() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a", "b", "c"]);
        let generation = started(&mut s);

        let first = s.take_next(generation).unwrap();
        let second = s.take_next(generation).unwrap();
        assert_eq!(first.id.as_str(), "a");
        assert_eq!(second.id.as_str(), "b");
        assert_eq!(first.attempt, 1);
        assert_eq!(
            statuses(&s),
            vec![ItemStatus::Active, ItemStatus::Active, ItemStatus::Pending]
        );
    }

    #[test]
    fn test_take_next_requires_processing() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a"]);
        assert!(s.take_next(0).is_none());
    }

    #[test]
    fn test_settle_records_outcome() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a", "b"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();
        let b = s.take_next(generation).unwrap();

        assert!(matches!(
            s.settle(generation, a.key, Ok("v1")),
            Settled::Succeeded { attempt: 1, .. }
        ));
        match s.settle(generation, b.key, Err(ItemError::failed("HTTP 422"))) {
            Settled::Failed { message, progress, .. } => {
                assert_eq!(message, "HTTP 422");
                assert_eq!(progress.completed, 2);
            }
            other => panic!("expected Failed, got {other:?}"),
        }

        let items = s.items();
        assert_eq!(items[0].result(), Some(&"v1"));
        assert_eq!(items[0].error(), None);
        assert_eq!(items[1].error(), Some("HTTP 422"));
        assert_eq!(items[1].result(), None);
    }

    #[test]
    fn test_settle_after_clear_is_stale() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();

        assert_eq!(s.clear(), 1);
        s.add([("a", 9)]);

        assert!(matches!(s.settle(generation, a.key, Ok("late")), Settled::Stale));
        assert_eq!(statuses(&s), vec![ItemStatus::Pending]);
        assert_eq!(s.progress().total, 1);
    }

    #[test]
    fn test_settle_after_remove_is_stale() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a", "b"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();

        assert_eq!(s.remove(&ItemId::new("a")), 1);
        assert!(matches!(s.settle(generation, a.key, Ok("late")), Settled::Stale));
        assert_eq!(s.progress().total, 1);
    }

    #[test]
    fn test_begin_is_reentrant_safe() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a"]);
        assert_eq!(s.begin(), Begin::Started { generation: 0, cycle: 1 });
        assert_eq!(s.begin(), Begin::AlreadyRunning);
    }

    #[test]
    fn test_begin_without_pending() {
        let mut s = Store::new(AdmissionPolicy::Skip);
        assert_eq!(s.begin(), Begin::NothingPending);
        assert!(!s.is_processing());
    }

    #[test]
    fn test_finish_only_when_settled() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();
        assert!(matches!(s.finish(generation), Finish::Busy));

        s.settle(generation, a.key, Ok("ok"));
        match s.finish(generation) {
            Finish::Drained(snap) => {
                assert!(!snap.is_processing);
                assert_eq!(snap.progress.completed, snap.progress.total);
                assert_eq!(snap.cycle, 1);
            }
            _ => panic!("expected Drained"),
        }
        assert!(matches!(s.finish(generation), Finish::Stale));
    }

    #[test]
    fn test_processing_held_until_close() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();
        s.settle(generation, a.key, Ok("ok"));

        assert!(matches!(s.finish(generation), Finish::Drained(_)));
        assert!(s.is_processing());
        assert!(s.status().is_processing);

        assert_eq!(s.close(generation), Close::Idle);
        assert!(!s.is_processing());
        assert_eq!(s.close(generation), Close::Stale);
    }

    #[test]
    fn test_begin_while_closing_continues_same_drain() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();
        s.settle(generation, a.key, Err(ItemError::failed("boom")));
        assert!(matches!(s.finish(generation), Finish::Drained(_)));

        assert_eq!(s.begin(), Begin::NothingPending);
        assert_eq!(s.retry_failed(), 1);
        assert!(s.take_next(generation).is_none());
        assert_eq!(s.begin(), Begin::Continued { generation, cycle: 2 });
        assert_eq!(s.begin(), Begin::AlreadyRunning);

        assert_eq!(s.close(generation), Close::Restart { cycle: 2 });
        assert!(s.is_processing());
        let again = s.take_next(generation).unwrap();
        assert_eq!(again.attempt, 2);
    }

    #[test]
    fn test_clear_while_closing_makes_close_stale() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();
        s.settle(generation, a.key, Ok("ok"));
        assert!(matches!(s.finish(generation), Finish::Drained(_)));

        s.clear();
        s.add([("b", 1)]);
        assert_eq!(s.begin(), Begin::Started { generation: generation + 1, cycle: 2 });
        assert_eq!(s.close(generation), Close::Stale);
        assert!(s.is_processing());
    }

    #[test]
    fn test_fail_orphaned_unblocks_finish() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a", "b"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();
        let _b = s.take_next(generation).unwrap();
        s.settle(generation, a.key, Ok("ok"));
        assert!(matches!(s.finish(generation), Finish::Busy));

        let orphans = s.fail_orphaned(generation);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id.as_str(), "b");
        assert_eq!(orphans[0].attempt, 1);
        assert_eq!(s.items()[1].error(), Some(ORPHANED));
        assert!(s.fail_orphaned(generation).is_empty());
        assert!(matches!(s.finish(generation), Finish::Drained(_)));
    }

    #[test]
    fn test_retry_failed_is_selective() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a", "b", "c"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();
        let b = s.take_next(generation).unwrap();
        let c = s.take_next(generation).unwrap();
        s.settle(generation, a.key, Ok("ok"));
        s.settle(generation, b.key, Err(ItemError::failed("boom")));
        s.settle(generation, c.key, Err(ItemError::failed("boom")));

        assert_eq!(s.retry_failed(), 2);
        assert_eq!(
            statuses(&s),
            vec![ItemStatus::Success, ItemStatus::Pending, ItemStatus::Pending]
        );
        assert_eq!(s.items()[1].error(), None);
        assert_eq!(s.items()[1].attempts(), 1);
        assert_eq!(s.progress().total, 3);
    }

    #[test]
    fn test_retry_item_only_touches_failed() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a", "b"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();
        s.settle(generation, a.key, Err(ItemError::failed("boom")));

        assert_eq!(s.retry_item(&ItemId::new("b")), 0);
        assert_eq!(s.retry_item(&ItemId::new("a")), 1);
        assert_eq!(statuses(&s), vec![ItemStatus::Pending, ItemStatus::Pending]);
    }

    #[test]
    fn test_admission_skip() {
        let mut s = store_with(AdmissionPolicy::Skip, &["a", "b"]);
        let report = s.add([("a", 10), ("c", 11), ("c", 12)]);
        assert_eq!(
            report,
            AddReport {
                added: 1,
                replaced: 0,
                skipped: 2
            }
        );
        assert_eq!(s.progress().total, 3);
    }

    #[test]
    fn test_admission_skip_ignores_settled() {
        let mut s = store_with(AdmissionPolicy::Skip, &["a"]);
        let generation = started(&mut s);
        let a = s.take_next(generation).unwrap();
        s.settle(generation, a.key, Ok("ok"));

        let report = s.add([("a", 10)]);
        assert_eq!(report.added, 1);
        assert_eq!(s.progress().total, 2);
    }

    #[test]
    fn test_admission_replace() {
        let mut s = store_with(AdmissionPolicy::Replace, &["a", "b"]);
        let generation = started(&mut s);
        let _a = s.take_next(generation).unwrap();

        // "a" is active → appended; "b" is pending → replaced in place.
        let report = s.add([("a", 100), ("b", 200)]);
        assert_eq!(report.added, 1);
        assert_eq!(report.replaced, 1);

        let items = s.items();
        assert_eq!(items.len(), 3);
        assert_eq!(*items[1].payload(), 200);
        assert_eq!(items[2].id().as_str(), "a");
        assert_eq!(*items[2].payload(), 100);
    }

    #[test]
    fn test_empty_ids_are_generated() {
        let mut s = Store::new(AdmissionPolicy::Skip);
        let report = s.add([("", 1), ("", 2)]);
        assert_eq!(report.added, 2);
        let items = s.items();
        assert_ne!(items[0].id(), items[1].id());
        assert!(items[0].id().as_str().starts_with("bulk-"));
    }

    #[test]
    fn test_clear_resets() {
        let mut s = store_with(AdmissionPolicy::Allow, &["a", "b"]);
        let generation = started(&mut s);
        s.take_next(generation).unwrap();

        s.clear();
        let snap = s.snapshot();
        assert!(snap.items.is_empty());
        assert!(!snap.is_processing);
        assert_eq!(snap.progress, Progress::default());
        assert_eq!(snap.generation, generation + 1);
        assert!(s.take_next(generation).is_none());
    }
}
