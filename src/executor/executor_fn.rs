//! # Function-backed executor (`ExecutorFn`)
//!
//! [`ExecutorFn`] wraps a closure `F: Fn(ItemId, P) -> Fut`, producing a fresh
//! future per dispatch. The closure may return any error convertible into
//! [`ItemError`] (`anyhow::Error`, `String`, `&str`, or `ItemError` itself).
//!
//! ## Concurrency semantics
//! - Each call to [`Executor::execute`] creates a **new** future owning its state.
//! - No hidden mutation between dispatches; share state through an explicit
//!   `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use bulkvisor::{ExecutorFn, ItemId};
//!
//! let exec = ExecutorFn::arc(|id: ItemId, cents: u32| async move {
//!     if cents == 0 {
//!         anyhow::bail!("product {id}: price must be positive");
//!     }
//!     Ok(cents)
//! });
//! # let _ = exec;
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::error::ItemError;
use crate::executor::executor::{ExecuteFuture, Executor};
use crate::items::ItemId;

/// Function-backed executor implementation.
pub struct ExecutorFn<F> {
    f: F,
}

impl<F> ExecutorFn<F> {
    /// Creates a new function-backed executor.
    ///
    /// Prefer [`ExecutorFn::arc`] when you immediately need an [`ExecutorRef`](crate::ExecutorRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the executor and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<P, R, E, F, Fut> Executor<P, R> for ExecutorFn<F>
where
    F: Fn(ItemId, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    E: Into<ItemError> + Send + 'static,
    R: Send + 'static,
{
    fn execute(&self, id: ItemId, payload: P) -> ExecuteFuture<R> {
        let fut = (self.f)(id, payload);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}
