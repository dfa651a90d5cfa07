//! # bulkvisor
//!
//! **Bulkvisor** is a client-side bulk-update queue for Rust.
//!
//! It pushes a batch of independent downstream updates through an injected
//! executor under a concurrency cap and a minimum spacing between dispatch
//! starts, tracks per-item and aggregate progress, supports selective retry of
//! failed items, and fires a one-shot completion notification per drain.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   add_items(ids, payloads)    process_queue()    retry_failed_items()    clear_queue()
//!            │                        │                    │                     │
//!            ▼                        ▼                    ▼                     ▼
//! ┌───────────────────────────────────────────────────────────────────────────────────┐
//! │  BulkQueue (cloneable handle)                                                     │
//! │  - QueueStore   (items in insertion order, generation, processing flag)           │
//! │  - watch<QueueStatus> (live progress for rendering)                               │
//! │  - Bus          (broadcast Arc<Event>)                                            │
//! └──────┬───────────────────────────────────────────────────────────────┬────────────┘
//!        ▼                                                               │
//! ┌──────────────────────────────┐                                       │
//! │  drain task (one per cycle)  │── take_next ──► JoinSet               │
//! │  - max_concurrent slots      │                (≤ max_concurrent)     │
//! │  - delay_between_updates     │                  │    │    │          │
//! └──────┬───────────────────────┘                  ▼    ▼    ▼          │
//!        │                              Executor::execute(id, payload)   │
//!        │                                          │    │    │          │
//!        │  all settled             settle(generation, key, outcome)     │
//!        ▼                                                               │
//!   Notifier ──► on_complete(final snapshot)   (exactly once per cycle)  │
//!                                                                        ▼
//! ┌───────────────────────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                                    │
//! │              (capacity: QueueConfig::bus_capacity)                                │
//! └─────────────────────────────────┬─────────────────────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  Tap (lag-tolerant)    │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                          SubscriberSet::run
//!                  (per-sub lanes, Subscribe::wants)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      worker1   worker2   workerN
//! ```
//!
//! ### Item lifecycle
//! ```text
//! add_items ──► pending ──dispatch──► active ──resolve──► success
//!                  ▲                     └────reject/panic──► error
//!                  └──── retry_failed_items / retry_item ◄──────┘
//!
//! clear_queue: items = [], processing = false, generation += 1
//!              (results of in-flight calls from the old generation are dropped)
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Queue**         | Append, drain, retry, remove, clear; read snapshots.           | [`BulkQueue`], [`BulkQueueBuilder`]         |
//! | **Executor**      | Injected one-item update capability.                           | [`Executor`], [`ExecutorFn`]                |
//! | **Progress**      | Aggregate counters derived from item statuses.                 | [`Progress`], [`QueueStatus`]               |
//! | **Subscriber API**| Hook into queue events (logging, metrics, custom subscribers). | [`Subscribe`], [`Event`], [`EventKind`]     |
//! | **Policies**      | Duplicate-identifier handling on append.                       | [`AdmissionPolicy`]                         |
//! | **Errors**        | Typed errors for configuration and item failures.              | [`QueueError`], [`ItemError`]               |
//! | **Configuration** | Concurrency cap, pacing, bus capacity.                         | [`QueueConfig`]                             |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bulkvisor::{BulkQueue, ExecutorFn, ItemId, QueueConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // PUT /products/{id} with the new price, simulated.
//!     let update = ExecutorFn::arc(|id: ItemId, cents: u32| async move {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!         if cents == 0 {
//!             anyhow::bail!("product {id}: price must be positive");
//!         }
//!         Ok(cents)
//!     });
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn bulkvisor::Subscribe>> = vec![Arc::new(bulkvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn bulkvisor::Subscribe>> = Vec::new();
//!
//!     let queue = BulkQueue::builder(update, QueueConfig::new(3, Duration::from_millis(20)))
//!         .with_subscribers(subs)
//!         .on_complete(|snap| {
//!             let p = snap.progress;
//!             println!("{} succeeded, {} failed", p.success, p.error);
//!         })
//!         .build()?;
//!
//!     queue.add_items([("101", 1999), ("102", 0), ("103", 2499)]);
//!     queue.process_queue();
//!     queue.wait_idle().await;
//!     assert_eq!(queue.progress().error, 1);
//!
//!     // Only the failed item runs again.
//!     queue.retry_failed_items();
//!     queue.process_queue();
//!     queue.wait_idle().await;
//!     assert_eq!(queue.snapshot().get("102").map(|it| it.attempts()), Some(2));
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod executor;
mod items;
mod policies;
mod progress;
mod subscribers;

// ---- Public re-exports ----

pub use config::QueueConfig;
pub use core::{AddReport, BulkQueue, BulkQueueBuilder, CompletionFn, ProcessOutcome};
pub use error::{ItemError, QueueError};
pub use events::{Event, EventKind};
pub use executor::{ExecuteFuture, Executor, ExecutorFn, ExecutorRef};
pub use items::{ItemId, ItemStatus, Output, Payload, QueueItem, QueueSnapshot, QueueStatus};
pub use policies::AdmissionPolicy;
pub use progress::Progress;
pub use subscribers::Subscribe;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
