//! # Queue configuration.
//!
//! Provides [`QueueConfig`] centralized settings for one [`BulkQueue`](crate::BulkQueue).
//!
//! ## Sentinel values
//! - `delay_between_updates = 0s` → no pacing (dispatch as fast as slots free up)
//! - `bus_capacity = 0` → clamped to 1 by the bus
//!
//! `max_concurrent` has no sentinel: `0` is rejected by [`QueueConfig::validate`].

use std::time::Duration;

use crate::error::QueueError;
use crate::policies::AdmissionPolicy;

/// Construction-time configuration for a bulk queue.
///
/// ## Field semantics
/// - `max_concurrent`: cap on simultaneously `active` items (`>= 1`)
/// - `delay_between_updates`: minimum spacing between two dispatch *starts*
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `admission`: what `add_items` does with an identifier that is already queued
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Maximum number of executor calls in flight at once.
    ///
    /// Applied to the whole queue, independent of pacing.
    pub max_concurrent: usize,

    /// Minimum time between the start of one dispatch and the start of the next.
    ///
    /// Enforced even when a concurrency slot is free, so a rate-limited
    /// downstream API never sees bursts.
    pub delay_between_updates: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages
    /// skip older events.
    pub bus_capacity: usize,

    /// Policy for identifiers that are already `pending` or `active`.
    pub admission: AdmissionPolicy,
}

impl QueueConfig {
    /// Creates a config with the given limits and default bus/admission settings.
    pub fn new(max_concurrent: usize, delay_between_updates: Duration) -> Self {
        Self {
            max_concurrent,
            delay_between_updates,
            ..Self::default()
        }
    }

    /// Returns the pacing delay as an `Option`.
    ///
    /// - `None` → no pacing
    /// - `Some(d)` → at least `d` between dispatch starts
    #[inline]
    pub fn pacing(&self) -> Option<Duration> {
        if self.delay_between_updates == Duration::ZERO {
            None
        } else {
            Some(self.delay_between_updates)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks the structural invariants of the config.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.max_concurrent < 1 {
            return Err(QueueError::InvalidConfig {
                field: "max_concurrent",
                reason: format!("must be at least 1, got {}", self.max_concurrent),
            });
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 2`
    /// - `delay_between_updates = 100ms`
    /// - `bus_capacity = 1024`
    /// - `admission = AdmissionPolicy::Skip`
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            delay_between_updates: Duration::from_millis(100),
            bus_capacity: 1024,
            admission: AdmissionPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = QueueConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.pacing(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let cfg = QueueConfig::new(0, Duration::ZERO);
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.as_label(), "queue_invalid_config");
        assert!(matches!(
            err,
            QueueError::InvalidConfig {
                field: "max_concurrent",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_delay_disables_pacing() {
        let cfg = QueueConfig::new(3, Duration::ZERO);
        assert_eq!(cfg.pacing(), None);
    }

    #[test]
    fn test_bus_capacity_clamped() {
        let cfg = QueueConfig {
            bus_capacity: 0,
            ..QueueConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
