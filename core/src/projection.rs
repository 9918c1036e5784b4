//! Projections: read models maintained from events.
//!
//! The workshop catalog is the query side of this service. It is seeded from
//! the feed and afterwards only changes by applying events, which makes it a
//! projection in the CQRS sense.
//!
//! ## Example
//!
//! ```ignore
//! impl Projection for WorkshopCatalog {
//!     type Event = DomainEvent;
//!
//!     fn name(&self) -> &str {
//!         "workshop_catalog"
//!     }
//!
//!     async fn apply_event(&self, event: &Self::Event) -> Result<()> {
//!         self.apply(event);
//!         Ok(())
//!     }
//! }
//! ```

use serde::Deserialize;
use std::future::Future;

/// Error type for projection operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Event processing error
    #[error("Event processing error: {0}")]
    EventProcessing(String),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;

/// A projection builds and maintains a read model from events.
pub trait Projection: Send + Sync {
    /// The event type this projection listens to.
    type Event: for<'de> Deserialize<'de> + Send;

    /// Get the projection name (used for logging and identification).
    fn name(&self) -> &str;

    /// Apply an event to update the projection.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if event processing fails.
    ///
    /// # Idempotency
    ///
    /// Events may be delivered more than once; implementations document
    /// whether they tolerate that.
    fn apply_event(&self, event: &Self::Event) -> impl Future<Output = Result<()>> + Send;
}
