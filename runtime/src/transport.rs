//! Mail transport trait and final payload rendering.

use crate::error::TransportError;
use confreg_core::environment::Environment;
use confreg_core::notification::{NotificationKind, NotificationMessage};
use std::future::Future;

/// Prepended to the subject outside production.
pub const TEST_SUBJECT_PREFIX: &str = "[TEST] ";

/// Prepended to the body outside production.
pub const TEST_BODY_BANNER: &str = "[This message is just a test. Please disregard and delete]\n";

/// The payload handed to a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMail {
    /// What the message is about.
    pub kind: NotificationKind,
    /// Recipient address.
    pub to: String,
    /// Final subject.
    pub subject: String,
    /// Final plain-text body.
    pub body: String,
}

impl OutboundMail {
    /// Render the final payload for `environment`.
    ///
    /// Outside production the subject gets [`TEST_SUBJECT_PREFIX`] and the
    /// body gets [`TEST_BODY_BANNER`]; in production the message is passed
    /// through untouched.
    #[must_use]
    pub fn render(message: &NotificationMessage, environment: Environment) -> Self {
        let (subject, body) = if environment.is_production() {
            (message.subject().to_string(), message.body().to_string())
        } else {
            (
                format!("{TEST_SUBJECT_PREFIX}{}", message.subject()),
                format!("{TEST_BODY_BANNER}{}", message.body()),
            )
        };

        Self {
            kind: message.kind(),
            to: message.recipient().to_string(),
            subject,
            body,
        }
    }
}

/// Mail transport.
///
/// This trait abstracts over the delivery mechanism (SMTP relay, console,
/// test doubles). Implementations may block for as long as the remote side
/// takes; the dispatcher bounds the call with its own timeout.
pub trait MailTransport: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if:
    /// - An address does not parse
    /// - The message cannot be built
    /// - The remote side rejects it or the connection fails
    fn deliver(&self, mail: &OutboundMail) -> impl Future<Output = Result<(), TransportError>> + Send;
}
