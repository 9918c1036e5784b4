//! Configuration management for the registration service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unlike a missing variable, a present but malformed one is an error: the
//! process must not start half-configured.

use confreg_core::environment::Environment;
use confreg_runtime::smtp::{DEFAULT_FROM_ADDRESS, SmtpConfig};
use confreg_runtime::DispatcherConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default worker wake interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Default delivery bound in seconds.
pub const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 30;

/// Default Prometheus scrape address.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9090";

/// Errors raised while reading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but its value does not parse.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Value as found.
        value: String,
        /// What was expected.
        reason: String,
    },
}

/// Where the workshop feed comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedConfig {
    /// URL or path of the feed (`FEED_LOCATION`).
    pub location: Option<String>,
    /// Local file that overrides `location` (`FEED_FILE`).
    pub file: Option<PathBuf>,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Workshop feed
    pub feed: FeedConfig,
    /// Notification dispatcher
    pub dispatcher: DispatcherConfig,
    /// SMTP relay; `None` selects the console transport
    pub smtp: Option<SmtpSettings>,
    /// Prometheus scrape address; `None` disables the exporter
    pub metrics_addr: Option<SocketAddr>,
}

/// SMTP settings as configured.
///
/// Kept separate from [`SmtpConfig`] so the password never shows up in
/// `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    /// Relay host
    pub host: String,
    /// Relay port
    pub port: u16,
    /// Implicit TLS
    pub use_ssl: bool,
    /// Username
    pub user: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Sender
    pub from: String,
    /// Blind copies
    pub bcc: Vec<String>,
}

impl SmtpSettings {
    /// `true` when only one of user and password is set. Such credentials
    /// are not used.
    #[must_use]
    pub const fn has_partial_credentials(&self) -> bool {
        self.user.is_some() != self.password.is_some()
    }

    /// Settings for the transport.
    ///
    /// Credentials are used only when both user and password are set.
    #[must_use]
    pub fn to_transport_config(&self) -> SmtpConfig {
        SmtpConfig {
            host: self.host.clone(),
            port: self.port,
            use_ssl: self.use_ssl,
            credentials: self.user.clone().zip(self.password.clone()),
            from: self.from.clone(),
            bcc: self.bcc.clone(),
        }
    }
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("bcc", &self.bcc)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set to a value
    /// that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set to a value
    /// that does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let feed = FeedConfig {
            location: get("FEED_LOCATION"),
            file: get("FEED_FILE").map(PathBuf::from),
        };

        let poll_interval_ms: u64 =
            parse_or(get("NOTIFICATION_POLL_INTERVAL_MS"), "NOTIFICATION_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if poll_interval_ms == 0 {
            return Err(invalid("NOTIFICATION_POLL_INTERVAL_MS", "0", "must be greater than zero"));
        }
        let delivery_timeout_secs: u64 = parse_or(
            get("NOTIFICATION_DELIVERY_TIMEOUT_SECS"),
            "NOTIFICATION_DELIVERY_TIMEOUT_SECS",
            DEFAULT_DELIVERY_TIMEOUT_SECS,
        )?;
        let environment: Environment = parse_or(get("APP_ENVIRONMENT"), "APP_ENVIRONMENT", Environment::Test)?;

        let dispatcher = DispatcherConfig {
            poll_interval: Duration::from_millis(poll_interval_ms),
            delivery_timeout: (delivery_timeout_secs > 0).then(|| Duration::from_secs(delivery_timeout_secs)),
            environment,
        };

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: parse_or(get("SMTP_PORT"), "SMTP_PORT", 25)?,
                use_ssl: parse_bool(get("SMTP_USE_SSL"), "SMTP_USE_SSL")?,
                user: get("SMTP_USER"),
                password: get("SMTP_PASSWORD"),
                from: get("MAIL_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
                bcc: get("MAIL_BCC").map(|raw| SmtpConfig::parse_bcc(&raw)).unwrap_or_default(),
            }),
            None => None,
        };
        if smtp.as_ref().is_some_and(SmtpSettings::has_partial_credentials) {
            tracing::warn!("SMTP_USER and SMTP_PASSWORD must both be set, connecting without credentials");
        }

        let metrics_addr = match get("METRICS_ADDR").as_deref() {
            Some(off) if off.eq_ignore_ascii_case("off") => None,
            raw => Some(parse_or(raw.map(str::to_string), "METRICS_ADDR", default_metrics_addr())?),
        };

        Ok(Self {
            feed,
            dispatcher,
            smtp,
            metrics_addr,
        })
    }
}

fn default_metrics_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9090))
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |value| {
        value.parse().map_err(|e: T::Err| invalid(key, &value, e.to_string()))
    })
}

fn parse_bool(raw: Option<String>, key: &str) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("false" | "0" | "no") => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some(other) => Err(invalid(key, other, "expected true or false")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.feed, FeedConfig::default());
        assert_eq!(config.dispatcher, DispatcherConfig::default());
        assert!(config.smtp.is_none());
        assert_eq!(config.metrics_addr, Some(DEFAULT_METRICS_ADDR.parse().unwrap()));
    }

    #[test]
    fn full_configuration() {
        let config = load(&[
            ("FEED_LOCATION", "https://feed.example.org/events/2025"),
            ("FEED_FILE", "/srv/feed.json"),
            ("NOTIFICATION_POLL_INTERVAL_MS", "250"),
            ("NOTIFICATION_DELIVERY_TIMEOUT_SECS", "0"),
            ("APP_ENVIRONMENT", "PRODUCTION"),
            ("SMTP_HOST", "smtp.example.org"),
            ("SMTP_PORT", "465"),
            ("SMTP_USE_SSL", "true"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASSWORD", "hunter2"),
            ("MAIL_BCC", "archive@example.org;audit@example.org"),
            ("METRICS_ADDR", "off"),
        ])
        .unwrap();

        assert_eq!(config.feed.location.as_deref(), Some("https://feed.example.org/events/2025"));
        assert_eq!(config.feed.file, Some(PathBuf::from("/srv/feed.json")));
        assert_eq!(config.dispatcher.poll_interval, Duration::from_millis(250));
        assert_eq!(config.dispatcher.delivery_timeout, None);
        assert_eq!(config.dispatcher.environment, Environment::Production);
        assert!(config.metrics_addr.is_none());

        let smtp = config.smtp.unwrap();
        let transport = smtp.to_transport_config();
        assert_eq!(transport.port, 465);
        assert!(transport.use_ssl);
        assert_eq!(transport.credentials, Some(("mailer".to_string(), "hunter2".to_string())));
        assert_eq!(transport.from, DEFAULT_FROM_ADDRESS);
        assert_eq!(transport.bcc.len(), 2);
        assert!(!format!("{smtp:?}").contains("hunter2"));
    }

    #[test]
    fn credentials_need_both_user_and_password() {
        let config = load(&[("SMTP_HOST", "smtp.example.org"), ("SMTP_USER", "mailer")]).unwrap();
        let smtp = config.smtp.unwrap();

        assert!(smtp.has_partial_credentials());
        assert_eq!(smtp.to_transport_config().credentials, None);

        let config = load(&[("SMTP_HOST", "smtp.example.org"), ("SMTP_PASSWORD", "hunter2")]).unwrap();
        assert!(config.smtp.unwrap().has_partial_credentials());

        let config = load(&[
            ("SMTP_HOST", "smtp.example.org"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASSWORD", "hunter2"),
        ])
        .unwrap();
        assert!(!config.smtp.unwrap().has_partial_credentials());
    }

    #[test]
    fn blank_values_are_unset() {
        let config = load(&[("FEED_LOCATION", "  "), ("SMTP_HOST", "")]).unwrap();

        assert!(config.feed.location.is_none());
        assert!(config.smtp.is_none());
    }

    #[test]
    fn malformed_values_are_rejected() {
        for (key, value) in [
            ("NOTIFICATION_POLL_INTERVAL_MS", "soon"),
            ("NOTIFICATION_POLL_INTERVAL_MS", "0"),
            ("NOTIFICATION_DELIVERY_TIMEOUT_SECS", "-1"),
            ("APP_ENVIRONMENT", "staging"),
            ("METRICS_ADDR", "localhost"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue { key: k, .. } if k == key),
                "{key}={value} gave {err}"
            );
        }

        let err = load(&[("SMTP_HOST", "smtp.example.org"), ("SMTP_USE_SSL", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "SMTP_USE_SSL"));
    }
}
