//! The authoritative in-memory workshop registry.
//!
//! # Concurrency
//!
//! The event store calls [`WorkshopCatalog::apply_event`] from its own thread
//! while request handlers call [`WorkshopCatalog::list`] and
//! [`WorkshopCatalog::by_id`] concurrently. A single `RwLock` guards the
//! backing vector: appends take the write lock, reads copy out under the read
//! lock, so no reader ever sees a partially appended record and every append
//! is visible to reads that start after it.
//!
//! # Duplicates
//!
//! The catalog does not deduplicate. Exactly-once delivery is the event
//! store's job; a repeated `WorkshopAdded` is appended again and logged, and
//! `by_id` keeps resolving to the first record with that id.

use crate::feed::{FeedError, FeedSource};
use confreg_core::event::{DomainEvent, Event};
use confreg_core::projection::{self, Projection};
use confreg_core::subscription::EventSubscriber;
use confreg_core::workshop::WorkshopRecord;
use metrics::counter;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Workshop registry seeded from the feed and grown by events.
#[derive(Debug, Default)]
pub struct WorkshopCatalog {
    workshops: RwLock<Vec<WorkshopRecord>>,
}

impl WorkshopCatalog {
    /// Create a catalog seeded with `workshops`.
    #[must_use]
    pub fn new(workshops: Vec<WorkshopRecord>) -> Self {
        counter!("catalog_workshops_seeded_total").increment(workshops.len() as u64);
        Self {
            workshops: RwLock::new(workshops),
        }
    }

    /// Create an empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the feed from `source` and seed a catalog with it.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the feed cannot be read or does not conform.
    /// [`FeedSource::Unconfigured`] is not an error and yields an empty catalog.
    pub async fn load(source: &FeedSource) -> Result<Self, FeedError> {
        let workshops = source.load().await?;
        tracing::info!(source = %source, workshops = workshops.len(), "Workshop catalog seeded");
        Ok(Self::new(workshops))
    }

    /// Snapshot of all workshops, in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<WorkshopRecord> {
        self.read().clone()
    }

    /// Look up a workshop by id.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<WorkshopRecord> {
        self.read().iter().find(|w| w.id.as_str() == id).cloned()
    }

    /// Number of workshops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// `true` when the catalog holds no workshops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Apply a domain event; the only way the catalog changes after seeding.
    ///
    /// Returns `true` if a workshop was appended. `WorkshopAdded` without a
    /// payload and every other event kind are no-ops.
    pub fn apply_event(&self, event: &DomainEvent) -> bool {
        match event {
            DomainEvent::WorkshopAdded {
                workshop: Some(workshop),
            } => {
                self.append(workshop.clone());
                counter!("catalog_events_applied_total").increment(1);
                true
            },
            DomainEvent::WorkshopAdded { workshop: None } => {
                tracing::debug!("WorkshopAdded without payload ignored");
                counter!("catalog_events_ignored_total").increment(1);
                false
            },
            other => {
                tracing::trace!(event_type = other.event_type(), "Event not relevant to catalog");
                counter!("catalog_events_ignored_total").increment(1);
                false
            },
        }
    }

    fn append(&self, workshop: WorkshopRecord) {
        let mut workshops = self.write();
        if workshops.iter().any(|w| w.id == workshop.id) {
            tracing::warn!(workshop_id = %workshop.id, "Duplicate workshop id appended to catalog");
        }
        tracing::info!(workshop_id = %workshop.id, title = %workshop.title, "Workshop added");
        workshops.push(workshop);
    }

    // A panic while holding the lock cannot leave the vector half-appended
    // (push is the only mutation), so poisoned guards are safe to reuse.
    fn read(&self) -> RwLockReadGuard<'_, Vec<WorkshopRecord>> {
        self.workshops.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<WorkshopRecord>> {
        self.workshops.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSubscriber for WorkshopCatalog {
    fn on_event(&self, event: &DomainEvent) {
        self.apply_event(event);
    }
}

impl Projection for WorkshopCatalog {
    type Event = DomainEvent;

    fn name(&self) -> &str {
        "workshop_catalog"
    }

    async fn apply_event(&self, event: &Self::Event) -> projection::Result<()> {
        Self::apply_event(self, event);
        Ok(())
    }
}
