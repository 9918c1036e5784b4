//! # Conference Registration Testing
//!
//! Testing utilities and in-memory doubles for the conference registration
//! service.
//!
//! This crate provides:
//! - Mock implementations of environment traits ([`FixedClock`])
//! - An in-memory event store that pushes to subscribers
//! - An in-memory event bus backed by tokio broadcast channels
//! - A recording mail transport with injectable failures and latency
//! - A builder for Collection+JSON feed documents
//!
//! ## Example
//!
//! ```ignore
//! use confreg_testing::{FeedBuilder, InMemoryEventStore};
//!
//! #[tokio::test]
//! async fn catalog_grows_from_events() {
//!     let feed = FeedBuilder::new().workshop("a", "A").build();
//!     let catalog = Arc::new(WorkshopCatalog::new(FeedIngestor::ingest(&feed)?));
//!
//!     let store = InMemoryEventStore::new();
//!     store.subscribe(catalog.clone());
//!     store.publish(&workshop_added("b"));
//!
//!     assert_eq!(catalog.len(), 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use confreg_core::environment::Clock;

pub mod event_bus;
pub mod event_store;
pub mod feed;
pub mod transport;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use confreg_testing::mocks::FixedClock;
    /// use confreg_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
/// Honors `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use event_bus::InMemoryEventBus;
pub use event_store::InMemoryEventStore;
pub use feed::FeedBuilder;
pub use mocks::{FixedClock, test_clock};
pub use transport::RecordingTransport;
