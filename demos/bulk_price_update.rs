//! # Example: Bulk price update
//!
//! Pushes a batch of product price changes through a simulated management API
//! with at most 3 requests in flight and 150ms between request starts. A few
//! products are rejected on the first pass; the completion hook reports the
//! outcome and the failed ones are retried once.
//!
//! Run with:
//! ```text
//! RUST_LOG=info cargo run --example bulk_price_update --features logging
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bulkvisor::{BulkQueue, ExecutorFn, ExecutorRef, ItemId, LogWriter, QueueConfig, Subscribe};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct PriceChange {
    cents: u32,
    compare_at: Option<u32>,
}

/// Simulated `PUT /api/management/products/{id}`.
///
/// Products ending in `3` are rate limited on their first call.
fn management_api() -> ExecutorRef<PriceChange, u32> {
    let seen: Arc<Mutex<HashSet<ItemId>>> = Arc::default();
    ExecutorFn::arc(move |id: ItemId, change: PriceChange| {
        let first_call = seen.lock().map(|mut s| s.insert(id.clone())).unwrap_or(false);
        async move {
            let jitter = u64::from(change.cents % 4) * 30;
            tokio::time::sleep(Duration::from_millis(80 + jitter)).await;

            if first_call && id.as_str().ends_with('3') {
                anyhow::bail!("HTTP 429 Too Many Requests");
            }
            if change.compare_at.is_some_and(|c| c <= change.cents) {
                anyhow::bail!("HTTP 422 compare_at_price must exceed price");
            }
            Ok(change.cents)
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let cfg = QueueConfig::new(3, Duration::from_millis(150));

    let queue = BulkQueue::builder(management_api(), cfg)
        .with_subscribers(subs)
        .on_complete(|snap| {
            let p = snap.progress;
            if p.has_errors() {
                println!(
                    "cycle {}: {} of {} prices updated, {} failed: {:?}",
                    snap.cycle,
                    p.success,
                    p.total,
                    p.error,
                    snap.failed_ids()
                );
            } else {
                println!("cycle {}: all {} prices updated", snap.cycle, p.total);
            }
        })
        .build()?;

    let batch = [
        ("gid://shopify/Product/7981231", 1999, None),
        ("gid://shopify/Product/7981232", 2499, Some(2999)),
        ("gid://shopify/Product/7981233", 999, None),
        ("gid://shopify/Product/7981234", 4999, Some(3999)),
        ("gid://shopify/Product/7981235", 1299, None),
        ("gid://shopify/Product/7981236", 1599, None),
        ("gid://shopify/Product/7981243", 899, None),
    ];
    queue.add_items(
        batch
            .into_iter()
            .map(|(id, cents, compare_at)| (id, PriceChange { cents, compare_at })),
    );

    queue.process_queue();

    let mut status = queue.watch();
    while status.changed().await.is_ok() {
        let s = *status.borrow_and_update();
        println!("progress: {:>5.1}% ({} active)", s.progress.percent(), s.progress.active);
        if !s.is_processing {
            break;
        }
    }
    queue.wait_idle().await;

    let retried = queue.retry_failed_items();
    if retried > 0 {
        println!("retrying {retried} failed item(s)");
        queue.process_queue();
        queue.wait_idle().await;
    }

    for item in queue.items() {
        println!(
            "{:<8} {:<8} attempts={} {}",
            item.id().as_str(),
            item.status().as_label(),
            item.attempts(),
            item.error().unwrap_or("")
        );
    }
    Ok(())
}
