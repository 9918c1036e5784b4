//! SMTP mail transport using Lettre.

use crate::error::TransportError;
use crate::transport::{MailTransport, OutboundMail};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Sender used when none is configured.
pub const DEFAULT_FROM_ADDRESS: &str = "program@example.org";

/// SMTP relay settings.
///
/// # Configuration
///
/// - `host`: SMTP server address (e.g., "smtp.example.org")
/// - `port`: SMTP server port (25 for plain relays, 465 for SSL)
/// - `use_ssl`: connect with TLS from the first byte
/// - `credentials`: optional username and password
/// - `from`: sender address
/// - `bcc`: addresses copied on every message
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    /// SMTP server address.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Connect over TLS.
    pub use_ssl: bool,
    /// Username and password, when the relay requires authentication.
    pub credentials: Option<(String, String)>,
    /// Sender address.
    pub from: String,
    /// Blind copies added to every message.
    pub bcc: Vec<String>,
}

impl SmtpConfig {
    /// Plain relay on port 25 without authentication.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 25,
            use_ssl: false,
            credentials: None,
            from: DEFAULT_FROM_ADDRESS.to_string(),
            bcc: Vec::new(),
        }
    }

    /// Split a `;`-separated bcc list, skipping blank entries.
    #[must_use]
    pub fn parse_bcc(raw: &str) -> Vec<String> {
        raw.split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// SMTP mail transport.
///
/// Sends real mail through the configured relay. Lettre's blocking
/// transport is driven on the blocking pool so the dispatcher's runtime
/// threads stay free.
///
/// # Examples
///
/// ```ignore
/// use confreg_runtime::{SmtpConfig, SmtpMailTransport};
///
/// let mut config = SmtpConfig::new("smtp.example.org");
/// config.port = 465;
/// config.use_ssl = true;
/// let transport = SmtpMailTransport::new(config)?;
/// ```
#[derive(Clone)]
pub struct SmtpMailTransport {
    mailer: SmtpTransport,
    from: Mailbox,
    bcc: Vec<Mailbox>,
}

impl SmtpMailTransport {
    /// Create a transport from `config`.
    ///
    /// Addresses are parsed up front so a misconfigured sender or bcc list
    /// fails at startup rather than on every delivery.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidAddress`] if the sender or a bcc
    /// address does not parse, or [`TransportError::Build`] if the TLS relay
    /// cannot be set up.
    pub fn new(config: SmtpConfig) -> Result<Self, TransportError> {
        let from = parse_mailbox(&config.from)?;
        let bcc = config
            .bcc
            .iter()
            .map(|address| parse_mailbox(address))
            .collect::<Result<Vec<_>, _>>()?;

        let builder = if config.use_ssl {
            SmtpTransport::relay(&config.host)
                .map_err(|e| TransportError::Build(format!("SMTP relay error: {e}")))?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        };
        let builder = builder.port(config.port);
        let builder = match config.credentials {
            Some((user, password)) => builder.credentials(Credentials::new(user, password)),
            None => builder,
        };

        tracing::info!(
            host = %config.host,
            port = config.port,
            use_ssl = config.use_ssl,
            bcc = bcc.len(),
            "SMTP transport configured"
        );

        Ok(Self {
            mailer: builder.build(),
            from,
            bcc,
        })
    }

    fn build_message(&self, mail: &OutboundMail) -> Result<Message, TransportError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&mail.to)?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for bcc in &self.bcc {
            builder = builder.bcc(bcc.clone());
        }
        builder
            .body(mail.body.clone())
            .map_err(|e| TransportError::Build(e.to_string()))
    }
}

impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        let message = self.build_message(mail)?;
        let mailer = self.mailer.clone();

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&message)
                .map_err(|e| TransportError::Send(e.to_string()))
        })
        .await
        .map_err(|e| TransportError::TaskFailed(e.to_string()))?
        .map(|_| ())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| TransportError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
