//! # Duplicate-identifier admission policy
//!
//! The queue treats the business identifier of an item as its **slot**.
//! When [`add_items`](crate::BulkQueue::add_items) receives an identifier that
//! is already `pending` or `active` in the current generation, the admission
//! policy decides what to do.
//!
//! ## Variants
//! - `Skip`: keep the queued item, **drop** the new payload.
//! - `Allow`: **append** the new payload as an independent item.
//! - `Replace`: **overwrite** the payload of a `pending` duplicate in place.
//!
//! ## Invariants
//! - Settled items (`success`/`error`) never block admission.
//! - An `active` item's payload is never changed; `Replace` appends instead.

/// Policy controlling how `add_items` treats identifiers that are already queued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdmissionPolicy {
    /// Drop the new payload if the identifier is already pending or active.
    ///
    /// Use when:
    /// - Batches are built from a UI selection and re-submitting is a mistake
    /// - The same record must never be updated twice in one run
    #[default]
    Skip,

    /// Queue the new payload as its own item.
    ///
    /// Use when:
    /// - Every submission must execute, in submission order
    /// - Example: stock increments that are not idempotent
    Allow,

    /// Replace the payload of a pending duplicate (latest wins).
    ///
    /// Use when:
    /// - The newest edit supersedes older ones
    /// - Example: an operator changes a price twice before the batch runs
    Replace,
}
