//! Error types used by the notification dispatcher and mail transports.
//!
//! - [`DispatchError`] — raised to producers when a message cannot be queued.
//! - [`TransportError`] — raised by a [`MailTransport`](crate::transport::MailTransport)
//!   for one delivery. The worker logs it and drops the message; it never
//!   reaches the producer.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`NotificationQueue::enqueue`](crate::dispatcher::NotificationQueue::enqueue).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The dispatcher has been shut down and accepts no more messages.
    #[error("notification queue is closed")]
    Closed,
}

/// Errors produced while delivering one message.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TransportError {
    /// A sender, recipient or bcc address does not parse.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The offending address.
        address: String,
        /// Parser message.
        reason: String,
    },

    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Build(String),

    /// The transport rejected or failed to send the message.
    #[error("failed to send message: {0}")]
    Send(String),

    /// Delivery did not finish within the configured bound.
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    /// The blocking send task panicked or was cancelled.
    #[error("delivery task failed: {0}")]
    TaskFailed(String),
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use confreg_runtime::TransportError;
    /// use std::time::Duration;
    ///
    /// let err = TransportError::Timeout(Duration::from_secs(30));
    /// assert_eq!(err.as_label(), "transport_timeout");
    /// ```
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::InvalidAddress { .. } => "transport_invalid_address",
            Self::Build(_) => "transport_build",
            Self::Send(_) => "transport_send",
            Self::Timeout(_) => "transport_timeout",
            Self::TaskFailed(_) => "transport_task_failed",
        }
    }
}
