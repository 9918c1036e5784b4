//! # Conference Registration Core
//!
//! Domain types and traits shared by every crate of the conference registration
//! service.
//!
//! The service keeps an authoritative in-memory catalog of workshops and sends
//! participants notifications about their reservations. This crate only
//! describes the shapes involved; the behavior lives in `confreg-catalog` and
//! `confreg-runtime`.
//!
//! ## Core Concepts
//!
//! - **Workshop**: A [`workshop::WorkshopRecord`] ingested from the feed or added by an event
//! - **Domain event**: An immutable fact delivered by the external event store ([`event::DomainEvent`])
//! - **Subscriber**: Anything the event store pushes events to ([`subscription::EventSubscriber`])
//! - **Notification**: An already-rendered outbound message ([`notification::NotificationMessage`])
//! - **Environment**: Injected dependencies and deployment mode ([`environment`])
//!
//! ## Data Flow
//!
//! ```text
//! Feed ──► FeedIngestor ──► WorkshopCatalog ◄── EventSubscription (event store)
//!
//! request handlers ──► NotificationQueue ──► NotificationWorker ──► MailTransport
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod event;
pub mod event_bus;
pub mod notification;
pub mod projection;
pub mod subscription;
pub mod workshop;

/// Environment module - Dependency injection traits and deployment mode
///
/// External dependencies that influence behavior (time, deployment mode) are
/// abstracted here so tests can substitute deterministic values.
pub mod environment {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;
    use thiserror::Error;

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock = SystemClock;
    ///
    /// // Test - fixed time for deterministic tests
    /// let clock = FixedClock::new(time);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Deployment mode of the running service.
    ///
    /// Anything other than [`Environment::Production`] decorates outbound
    /// messages so recipients can tell they came from a test system.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Environment {
        /// Live system, messages go out undecorated.
        Production,
        /// Any non-production deployment.
        #[default]
        Test,
    }

    impl Environment {
        /// Returns `true` for the production deployment.
        #[must_use]
        pub const fn is_production(self) -> bool {
            matches!(self, Self::Production)
        }

        /// Stable lowercase name, as accepted by [`FromStr`].
        #[must_use]
        pub const fn as_str(self) -> &'static str {
            match self {
                Self::Production => "production",
                Self::Test => "test",
            }
        }
    }

    impl fmt::Display for Environment {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// Returned when an environment name is not recognised.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    #[error("Unknown environment '{0}' (expected 'production' or 'test')")]
    pub struct ParseEnvironmentError(pub String);

    impl FromStr for Environment {
        type Err = ParseEnvironmentError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_ascii_lowercase().as_str() {
                "production" | "prod" => Ok(Self::Production),
                "test" => Ok(Self::Test),
                other => Err(ParseEnvironmentError(other.to_string())),
            }
        }
    }
}
