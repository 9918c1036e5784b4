//! Console mail transport for development and testing.

use crate::error::TransportError;
use crate::transport::{MailTransport, OutboundMail};
use tracing::info;

/// Console mail transport.
///
/// Logs messages instead of sending them. Used when no SMTP relay is
/// configured so the dispatcher still runs end to end on a laptop.
///
/// # Examples
///
/// ```ignore
/// use confreg_runtime::{ConsoleMailTransport, Dispatcher, DispatcherConfig};
///
/// let (queue, handle) = Dispatcher::spawn(ConsoleMailTransport::new(), DispatcherConfig::default());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConsoleMailTransport;

impl ConsoleMailTransport {
    /// Create a new console transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MailTransport for ConsoleMailTransport {
    async fn deliver(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        info!(
            to = %mail.to,
            kind = %mail.kind,
            subject = %mail.subject,
            "📧 Notification (console transport)"
        );
        println!("\n──────────────────────────────────────────────────────────────");
        println!("To: {}", mail.to);
        println!("Subject: {}", mail.subject);
        println!("──────────────────────────────────────────────────────────────");
        println!("{}", mail.body);
        println!("──────────────────────────────────────────────────────────────\n");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confreg_core::notification::NotificationKind;

    #[tokio::test]
    async fn console_delivery_always_succeeds() {
        let mail = OutboundMail {
            kind: NotificationKind::Waitlisted,
            to: "ada@example.org".to_string(),
            subject: "You are on the waiting list".to_string(),
            body: "We will let you know.".to_string(),
        };

        assert!(ConsoleMailTransport::new().deliver(&mail).await.is_ok());
    }
}
