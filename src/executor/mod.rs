//! # Executor abstractions.
//!
//! This module provides the injected per-item update capability:
//! - [`Executor`] - trait for one downstream update
//! - [`ExecutorFn`] - closure-backed implementation
//! - [`ExecutorRef`] - shared reference (`Arc<dyn Executor<P, R>>`)
//! - [`ExecuteFuture`] - boxed future returned by one call

#[allow(clippy::module_inception)]
mod executor;
mod executor_fn;

pub use executor::{ExecuteFuture, Executor, ExecutorRef};
pub use executor_fn::ExecutorFn;
