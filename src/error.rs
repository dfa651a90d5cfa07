//! Error types used by the bulk queue and its executors.
//!
//! This module defines two main error enums:
//!
//! - [`QueueError`]: errors raised by the queue itself (construction-time only).
//! - [`ItemError`]: errors raised by a single executor call.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! Item errors never escape [`BulkQueue::process_queue`](crate::BulkQueue::process_queue):
//! they are stored on the item that produced them.

use thiserror::Error;

/// # Errors produced by the queue runtime.
///
/// Only structurally invalid configuration fails fast; everything that happens
/// while draining is recorded on items instead.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// A configuration field holds a value the scheduler cannot work with.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the offending [`QueueConfig`](crate::QueueConfig) field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use bulkvisor::QueueError;
    ///
    /// let err = QueueError::InvalidConfig { field: "max_concurrent", reason: "must be >= 1".into() };
    /// assert_eq!(err.as_label(), "queue_invalid_config");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::InvalidConfig { .. } => "queue_invalid_config",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            QueueError::InvalidConfig { field, reason } => {
                format!("config field {field} rejected: {reason}")
            }
        }
    }
}

/// # Errors produced by one executor call.
///
/// Whatever the executor returns (or however it blows up) ends up here and is
/// attached to the item as its `error` message.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// The executor rejected the update.
    #[error("update failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The executor panicked while performing the update.
    #[error("executor panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl ItemError {
    /// Builds a [`ItemError::Failed`] from anything printable.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        ItemError::Failed {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use bulkvisor::ItemError;
    ///
    /// let err = ItemError::failed("HTTP 429: Too Many Requests");
    /// assert_eq!(err.as_label(), "item_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ItemError::Failed { .. } => "item_failed",
            ItemError::Panicked { .. } => "item_panicked",
        }
    }

    /// Returns the message stored on the failed item.
    ///
    /// For [`ItemError::Failed`] this is the executor's own message, unchanged,
    /// so a UI can show it verbatim.
    pub fn as_message(&self) -> String {
        match self {
            ItemError::Failed { error } => error.clone(),
            ItemError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

impl From<anyhow::Error> for ItemError {
    fn from(err: anyhow::Error) -> Self {
        // `{:#}` keeps the context chain on one line.
        ItemError::Failed {
            error: format!("{err:#}"),
        }
    }
}

impl From<String> for ItemError {
    fn from(error: String) -> Self {
        ItemError::Failed { error }
    }
}

impl From<&str> for ItemError {
    fn from(error: &str) -> Self {
        ItemError::Failed {
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_message_is_verbatim() {
        let err = ItemError::from("HTTP 500: Internal Server Error");
        assert_eq!(err.as_message(), "HTTP 500: Internal Server Error");
        assert_eq!(err.to_string(), "update failed: HTTP 500: Internal Server Error");
    }

    #[test]
    fn test_anyhow_context_is_kept() {
        let err: ItemError = anyhow::anyhow!("connection reset")
            .context("PUT /api/management/products/42")
            .into();
        assert_eq!(
            err.as_message(),
            "PUT /api/management/products/42: connection reset"
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(ItemError::failed("x").as_label(), "item_failed");
        let panicked = ItemError::Panicked { info: "boom".into() };
        assert_eq!(panicked.as_label(), "item_panicked");
        assert_eq!(panicked.as_message(), "panic: boom");
    }
}
