//! # Executor abstraction.
//!
//! The [`Executor`] performs exactly one downstream update for one item. The
//! queue treats it as an opaque capability: it never retries on its own, never
//! assumes idempotence, and tolerates any failure (including panics).
//!
//! `execute` returns a boxed `'static` future so an in-flight call can outlive
//! a [`clear_queue`](crate::BulkQueue::clear_queue); its result is then discarded.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ItemError;
use crate::items::ItemId;

/// Future produced by one executor call.
pub type ExecuteFuture<R> = Pin<Box<dyn Future<Output = Result<R, ItemError>> + Send + 'static>>;

/// Shared handle to an executor.
pub type ExecutorRef<P, R> = Arc<dyn Executor<P, R>>;

/// # One-item update capability.
///
/// # Example
/// ```
/// use bulkvisor::{ExecuteFuture, Executor, ItemError, ItemId};
///
/// struct PriceUpdater;
///
/// impl Executor<u32, ()> for PriceUpdater {
///     fn execute(&self, id: ItemId, cents: u32) -> ExecuteFuture<()> {
///         Box::pin(async move {
///             if cents == 0 {
///                 return Err(ItemError::failed(format!("product {id}: price must be positive")));
///             }
///             // PUT /api/management/products/{id} ...
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Executor<P, R>: Send + Sync + 'static {
    /// Starts the update of `id` with `payload`.
    ///
    /// Called once per dispatch; a retried item is executed again with the
    /// same payload.
    fn execute(&self, id: ItemId, payload: P) -> ExecuteFuture<R>;
}
