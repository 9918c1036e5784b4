//! `CatalogSubscription` keeps a projection current from an event bus topic.
//!
//! # Overview
//!
//! When the event store exposes its events on a bus instead of calling
//! subscribers directly, this runner pulls them and applies them:
//!
//! ```text
//! ┌─────────────┐
//! │  Event Bus  │
//! └──────┬──────┘
//!        │ SerializedEvent
//!        ▼
//! ┌───────────────────┐   decode   ┌─────────────────┐
//! │CatalogSubscription│ ─────────► │ WorkshopCatalog │
//! └───────────────────┘            └─────────────────┘
//! ```
//!
//! A single event that fails to decode or apply is logged and skipped; the
//! runner only stops when the stream ends or the shutdown signal is sent.
//!
//! # Example
//!
//! ```ignore
//! let catalog = Arc::new(WorkshopCatalog::load(&source).await?);
//! let (subscription, shutdown) =
//!     CatalogSubscription::subscribe(catalog.clone(), event_bus, "workshop-events").await?;
//!
//! let handle = tokio::spawn(subscription.run());
//!
//! // Later:
//! shutdown.send(true).ok();
//! handle.await??;
//! ```

use confreg_core::event::{DomainEvent, SerializedEvent};
use confreg_core::event_bus::{EventBus, EventStream};
use confreg_core::projection::{Projection, ProjectionError, Result};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;

/// Applies events from an event bus topic to a projection.
pub struct CatalogSubscription<P>
where
    P: Projection<Event = DomainEvent>,
{
    projection: Arc<P>,
    events: EventStream,
    /// Topic the stream was opened on
    topic: String,
    /// Shutdown signal
    shutdown: watch::Receiver<bool>,
}

impl<P> CatalogSubscription<P>
where
    P: Projection<Event = DomainEvent>,
{
    /// Subscribe to `topic` on `event_bus`.
    ///
    /// The subscription is opened before this returns, so events published
    /// afterwards are not missed even if [`run`](Self::run) is spawned later.
    ///
    /// Returns the subscription and a shutdown sender. Send `true` to stop it.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::EventProcessing`] if the bus refuses the
    /// subscription.
    pub async fn subscribe(
        projection: Arc<P>,
        event_bus: Arc<dyn EventBus>,
        topic: impl Into<String>,
    ) -> Result<(Self, watch::Sender<bool>)> {
        let topic = topic.into();
        let events = event_bus.subscribe(&[topic.as_str()]).await.map_err(|e| {
            ProjectionError::EventProcessing(format!("Failed to subscribe to '{topic}': {e}"))
        })?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let subscription = Self {
            projection,
            events,
            topic,
            shutdown: shutdown_rx,
        };
        Ok((subscription, shutdown_tx))
    }

    /// Process events until shutdown or end of stream.
    ///
    /// Returns the number of events applied.
    ///
    /// # Errors
    ///
    /// Per-event failures are logged, not returned; the `Result` is kept for
    /// symmetry with other long-running tasks.
    pub async fn run(mut self) -> Result<u64> {
        let projection_name = self.projection.name().to_string();
        tracing::info!(projection = %projection_name, topic = %self.topic, "Catalog subscription started");

        let mut applied = 0_u64;
        while !*self.shutdown.borrow() {
            tokio::select! {
                next = self.events.next() => match next {
                    Some(Ok(serialized)) => match Self::process(&self.projection, &serialized).await {
                        Ok(()) => applied += 1,
                        Err(e) => tracing::error!(
                            projection = %projection_name,
                            event_type = %serialized.event_type,
                            error = %e,
                            "Failed to apply event"
                        ),
                    },
                    Some(Err(e)) => {
                        tracing::error!(projection = %projection_name, error = %e, "Error receiving event from bus");
                    },
                    None => {
                        tracing::info!(projection = %projection_name, "Event stream ended");
                        break;
                    },
                },
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        tracing::info!(projection = %projection_name, "Shutdown signal received");
                        break;
                    }
                },
            }
        }

        tracing::info!(projection = %projection_name, applied, "Catalog subscription stopped");
        Ok(applied)
    }

    // Borrows only the projection: the event stream is `Send` but not `Sync`.
    async fn process(projection: &P, serialized: &SerializedEvent) -> Result<()> {
        let event = DomainEvent::from_serialized(serialized).map_err(|e| {
            ProjectionError::Serialization(format!(
                "Failed to decode event {}: {e}",
                serialized.event_type
            ))
        })?;
        projection.apply_event(&event).await
    }
}
