//! Queue policies.
//!
//! ## Contents
//! - [`AdmissionPolicy`] what `add_items` does with identifiers already in flight
//!
//! ## Defaults
//! - `AdmissionPolicy::Skip`.

mod admission;

pub use admission::AdmissionPolicy;
