//! Push interface through which the external event store notifies subscribers.
//!
//! The event store calls [`EventSubscriber::on_event`] on every registered
//! subscriber, synchronously and in publish order, with at-least-once delivery.
//! Replay after restart and exactly-once delivery are the event store's
//! business, not this interface's.
//!
//! ```text
//! ┌─────────────┐  on_event(&DomainEvent)  ┌─────────────────┐
//! │ Event store │ ───────────────────────► │ WorkshopCatalog │
//! └─────────────┘                          └─────────────────┘
//! ```

use crate::event::DomainEvent;
use std::sync::Arc;

/// Receives domain events pushed by the event store.
///
/// Implementations are called from the event store's own thread while other
/// threads may be reading, so they must be `Send + Sync` and do their own
/// synchronization. A subscriber must not fail the publisher: anything it
/// cannot handle is ignored or logged.
pub trait EventSubscriber: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &DomainEvent);
}

impl<S: EventSubscriber + ?Sized> EventSubscriber for Arc<S> {
    fn on_event(&self, event: &DomainEvent) {
        (**self).on_event(event);
    }
}

/// Registration side of an event store.
pub trait EventSubscription {
    /// Register a subscriber; it receives every event published afterwards.
    fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>);
}
