//! # Event subscribers for the bulk queue.
//!
//! This module provides the [`Subscribe`] trait, the `SubscriberSet` fan-out
//! and built-in implementations for handling events published by the queue.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Dispatcher ── publish(Event) ──► Bus ──► Tap ──► SubscriberSet::run
//!                                                                       │
//!                                                           ┌───────────┼──────────┐
//!                                                           ▼           ▼          ▼
//!                                                       LogWriter   Metrics    Custom
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** observe and react to events (logging, metrics, alerts)
//! - **Hook subscribers** act on per-item outcomes (`ItemSucceeded` / `ItemFailed`)

#[cfg(feature = "logging")]
mod embedded;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscriber::Subscribe;
pub(crate) use subscriber_set::SubscriberSet;
