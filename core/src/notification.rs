//! Outbound notifications.
//!
//! A [`NotificationMessage`] is rendered by the request handler that creates
//! it; the dispatcher only decorates and delivers it. Construction enforces a
//! non-empty recipient.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when building a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The recipient address was empty or whitespace.
    #[error("Notification recipient must not be empty")]
    EmptyRecipient,
}

/// What a notification is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A seat was reserved.
    ReservationConfirmed,
    /// The workshop was full, the participant is on the waiting list.
    Waitlisted,
    /// A waiting-list participant got a seat.
    WaitlistPromoted,
    /// A reservation was cancelled.
    Cancellation,
    /// The participant must confirm their address.
    EmailVerification,
}

impl NotificationKind {
    /// Subject used unless the message overrides it.
    #[must_use]
    pub const fn default_subject(self) -> &'static str {
        match self {
            Self::ReservationConfirmed => "Your workshop reservation is confirmed",
            Self::Waitlisted => "You are on the waiting list",
            Self::WaitlistPromoted => "A seat is now available for you",
            Self::Cancellation => "Your workshop reservation was cancelled",
            Self::EmailVerification => "Please confirm your email address",
        }
    }

    /// Short stable label (snake_case) for use in logs/metrics.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::ReservationConfirmed => "reservation_confirmed",
            Self::Waitlisted => "waitlisted",
            Self::WaitlistPromoted => "waitlist_promoted",
            Self::Cancellation => "cancellation",
            Self::EmailVerification => "email_verification",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A rendered message waiting for delivery.
///
/// Deserialization applies the same recipient check as [`NotificationMessage::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNotificationMessage")]
pub struct NotificationMessage {
    kind: NotificationKind,
    recipient: String,
    subject: String,
    body: String,
}

#[derive(Deserialize)]
struct RawNotificationMessage {
    kind: NotificationKind,
    recipient: String,
    subject: String,
    body: String,
}

impl TryFrom<RawNotificationMessage> for NotificationMessage {
    type Error = NotificationError;

    fn try_from(raw: RawNotificationMessage) -> Result<Self, Self::Error> {
        Ok(Self::new(raw.kind, raw.recipient, raw.body)?.with_subject(raw.subject))
    }
}

impl NotificationMessage {
    /// Create a message with the kind's default subject.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::EmptyRecipient`] if `recipient` is blank.
    ///
    /// # Example
    ///
    /// ```
    /// use confreg_core::notification::{NotificationKind, NotificationMessage};
    ///
    /// let message = NotificationMessage::new(
    ///     NotificationKind::ReservationConfirmed,
    ///     "ada@example.org",
    ///     "See you at Rust 101!",
    /// )?;
    /// assert_eq!(message.subject(), "Your workshop reservation is confirmed");
    /// # Ok::<(), confreg_core::notification::NotificationError>(())
    /// ```
    pub fn new(
        kind: NotificationKind,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, NotificationError> {
        let recipient = recipient.into().trim().to_string();
        if recipient.is_empty() {
            return Err(NotificationError::EmptyRecipient);
        }
        Ok(Self {
            kind,
            recipient,
            subject: kind.default_subject().to_string(),
            body: body.into(),
        })
    }

    /// Replace the default subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Message kind.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        self.kind
    }

    /// Recipient address, never empty.
    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Rendered subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Rendered body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_recipient_is_rejected() {
        let result = NotificationMessage::new(NotificationKind::Cancellation, "   ", "bye");
        assert_eq!(result, Err(NotificationError::EmptyRecipient));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn subject_can_be_overridden() {
        let message = NotificationMessage::new(NotificationKind::Waitlisted, " grace@example.org ", "body")
            .expect("valid message")
            .with_subject("Rust 101 is full");

        assert_eq!(message.recipient(), "grace@example.org");
        assert_eq!(message.subject(), "Rust 101 is full");
        assert_eq!(message.kind().as_label(), "waitlisted");
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn deserializing_checks_the_recipient() {
        let blank = r#"{"kind":"Cancellation","recipient":" ","subject":"s","body":"b"}"#;
        assert!(serde_json::from_str::<NotificationMessage>(blank).is_err());

        let valid = r#"{"kind":"Cancellation","recipient":"ada@example.org","subject":"s","body":"b"}"#;
        let message: NotificationMessage = serde_json::from_str(valid).expect("valid message");
        assert_eq!(message.recipient(), "ada@example.org");
        assert_eq!(message.subject(), "s");
    }
}
