//! Recording mail transport.
//!
//! Captures every delivery attempt instead of sending anything. Failures can
//! be injected per recipient and a fixed latency can be added to exercise
//! delivery timeouts under paused tokio time.

use confreg_runtime::error::TransportError;
use confreg_runtime::transport::{MailTransport, OutboundMail};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Recorded {
    attempts: Vec<OutboundMail>,
    delivered: Vec<OutboundMail>,
    failing: HashSet<String>,
}

/// Mail transport that records instead of sending.
///
/// Clones share one log, so a test keeps a clone while the dispatcher owns
/// the other.
///
/// # Example
///
/// ```ignore
/// let transport = RecordingTransport::new().fail_for("b@example.org");
/// let (queue, handle) = Dispatcher::spawn(transport.clone(), config);
/// // ...
/// assert_eq!(transport.delivered_recipients(), vec!["a@example.org", "c@example.org"]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecordingTransport {
    recorded: Arc<Mutex<Recorded>>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    /// Create a transport that accepts everything immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message addressed to `recipient`.
    #[must_use]
    pub fn fail_for(self, recipient: impl Into<String>) -> Self {
        self.lock().failing.insert(recipient.into());
        self
    }

    /// Sleep for `delay` before each delivery completes.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every message handed to the transport, in order.
    #[must_use]
    pub fn attempts(&self) -> Vec<OutboundMail> {
        self.lock().attempts.clone()
    }

    /// Messages that were accepted, in order.
    #[must_use]
    pub fn delivered(&self) -> Vec<OutboundMail> {
        self.lock().delivered.clone()
    }

    /// Recipients of accepted messages, in order.
    #[must_use]
    pub fn delivered_recipients(&self) -> Vec<String> {
        self.lock().delivered.iter().map(|m| m.to.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MailTransport for RecordingTransport {
    async fn deliver(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        let fails = {
            let mut recorded = self.lock();
            recorded.attempts.push(mail.clone());
            recorded.failing.contains(&mail.to)
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if fails {
            tracing::debug!(to = %mail.to, "Recording transport rejecting message");
            return Err(TransportError::Send(format!("injected failure for {}", mail.to)));
        }

        self.lock().delivered.push(mail.clone());
        Ok(())
    }
}
