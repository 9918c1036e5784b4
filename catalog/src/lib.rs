//! Workshop catalog for the conference registration service.
//!
//! # Overview
//!
//! - [`feed`]: parses the external Collection+JSON feed into workshop records
//! - [`catalog`]: the authoritative registry, seeded once and then changed
//!   only by domain events
//! - [`subscription`]: keeps a catalog current from an event bus topic
//!
//! # Startup
//!
//! ```ignore
//! use confreg_catalog::{FeedSource, WorkshopCatalog};
//!
//! let source = FeedSource::resolve(config.feed_location.as_deref(), None)?;
//! let catalog = Arc::new(WorkshopCatalog::load(&source).await?);
//!
//! // Register with the event store so later WorkshopAdded events land here.
//! event_store.subscribe(catalog.clone());
//! ```

pub mod catalog;
pub mod feed;
pub mod subscription;

// Re-export main types for convenience
pub use catalog::WorkshopCatalog;
pub use feed::{FeedError, FeedIngestor, FeedSource};
pub use subscription::CatalogSubscription;
