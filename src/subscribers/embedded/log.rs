//! # LogWriter: tracing-backed event logger
//!
//! A minimal subscriber that renders incoming [`Event`]s through `tracing`.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output
//! ```text
//! INFO bulkvisor: [drain-started] cycle=1 total=10
//! INFO bulkvisor: [dispatched] item=7981234 attempt=1
//! WARN bulkvisor: [failed] item=7981235 attempt=1 err=HTTP 429: Too Many Requests
//! INFO bulkvisor: [drain-completed] cycle=1 success=9 error=1 total=10
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "bulkvisor";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let item = e.item.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        let progress = e.progress.unwrap_or_default();

        match e.kind {
            EventKind::ItemsAdded => {
                info!(target: TARGET, "[added] count={:?} total={}", e.count, progress.total);
            }
            EventKind::ItemsSkipped => {
                info!(target: TARGET, "[skipped-duplicates] count={:?}", e.count);
            }
            EventKind::ItemsRetried => {
                info!(target: TARGET, "[retried] item={item} count={:?}", e.count);
            }
            EventKind::ItemRemoved => {
                info!(target: TARGET, "[removed] item={item} count={:?}", e.count);
            }
            EventKind::QueueCleared => {
                info!(
                    target: TARGET,
                    "[cleared] discarded={:?} generation={:?}", e.count, e.generation
                );
            }
            EventKind::DrainStarted => {
                info!(
                    target: TARGET,
                    "[drain-started] cycle={:?} total={}", e.cycle, progress.total
                );
            }
            EventKind::ItemDispatched => {
                info!(target: TARGET, "[dispatched] item={item} attempt={:?}", e.attempt);
            }
            EventKind::ItemSucceeded => {
                info!(target: TARGET, "[succeeded] item={item} attempt={:?}", e.attempt);
            }
            EventKind::ItemFailed => {
                warn!(
                    target: TARGET,
                    "[failed] item={item} attempt={:?} err={reason}", e.attempt
                );
            }
            EventKind::StaleResultDropped => {
                info!(
                    target: TARGET,
                    "[stale-result] item={item} generation={:?}", e.generation
                );
            }
            EventKind::DrainCompleted => {
                info!(
                    target: TARGET,
                    "[drain-completed] cycle={:?} success={} error={} total={}",
                    e.cycle,
                    progress.success,
                    progress.error,
                    progress.total
                );
            }
            EventKind::CallbackPanicked => {
                warn!(target: TARGET, "[callback-panicked] cycle={:?} info={reason}", e.cycle);
            }
            EventKind::SubscriberOverflow => {
                warn!(
                    target: TARGET,
                    "[subscriber-overflow] subscriber={item} reason={reason}"
                );
            }
            EventKind::SubscriberPanicked => {
                warn!(
                    target: TARGET,
                    "[subscriber-panicked] subscriber={item} info={reason}"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
