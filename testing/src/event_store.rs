//! In-memory event store that pushes events to subscribers.
//!
//! Stands in for the external event store: `publish` calls every registered
//! [`EventSubscriber`] synchronously, in registration order, on the caller's
//! thread. Every published event is also kept so tests can inspect history
//! or replay it into a late subscriber.

use confreg_core::event::DomainEvent;
use confreg_core::subscription::{EventSubscriber, EventSubscription};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct StoreState {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
    history: Vec<DomainEvent>,
}

/// In-memory event store for fast, deterministic tests.
///
/// # Example
///
/// ```ignore
/// let store = InMemoryEventStore::new();
/// store.subscribe(catalog.clone());
///
/// store.publish(&DomainEvent::WorkshopAdded { workshop: Some(record) });
/// assert_eq!(store.history().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryEventStore {
    /// Create an empty store with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `event` and push it to every subscriber.
    ///
    /// Publishes are serialized: a second `publish` waits until every
    /// subscriber has seen the first.
    pub fn publish(&self, event: &DomainEvent) {
        let mut state = self.lock();
        state.history.push(event.clone());
        for subscriber in &state.subscribers {
            subscriber.on_event(event);
        }
    }

    /// Publish the same event `times` times (at-least-once redelivery).
    pub fn redeliver(&self, event: &DomainEvent, times: usize) {
        for _ in 0..times {
            self.publish(event);
        }
    }

    /// Push the whole history to `subscriber`, then register it.
    pub fn subscribe_with_replay(&self, subscriber: Arc<dyn EventSubscriber>) {
        let mut state = self.lock();
        for event in &state.history {
            subscriber.on_event(event);
        }
        state.subscribers.push(subscriber);
    }

    /// Every event published so far, in order.
    #[must_use]
    pub fn history(&self) -> Vec<DomainEvent> {
        self.lock().history.clone()
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSubscription for InMemoryEventStore {
    fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.lock().subscribers.push(subscriber);
    }
}

impl std::fmt::Debug for InMemoryEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryEventStore")
            .field("subscribers", &state.subscribers.len())
            .field("history", &state.history.len())
            .finish()
    }
}
