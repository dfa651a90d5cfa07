//! Queue core: storage, dispatch and completion.
//!
//! The public API from this module is [`BulkQueue`] and its builder.
//!
//! Internal modules:
//! - [`store`]: item list, generations and the item state machine;
//! - [`dispatcher`]: bounded, paced drain loop and per-item settlement;
//! - [`notifier`]: once-per-cycle completion delivery;
//! - [`queue`]: shared state and the consumer-facing handle;
//! - [`builder`]: queue construction and subscriber wiring.

mod builder;
mod dispatcher;
mod notifier;
mod queue;
mod store;

pub use builder::BulkQueueBuilder;
pub use notifier::CompletionFn;
pub use queue::{BulkQueue, ProcessOutcome};
pub use store::AddReport;
