//! Tests for the in-memory doubles

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use confreg_core::event::{DomainEvent, SerializedEvent};
use confreg_core::event_bus::{EventBus, EventBusError};
use confreg_core::subscription::{EventSubscriber, EventSubscription};
use confreg_core::workshop::{WorkshopId, WorkshopRecord};
use confreg_testing::{InMemoryEventBus, InMemoryEventStore};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio_test::assert_ok;

#[derive(Default)]
struct Collector {
    seen: Mutex<Vec<String>>,
}

impl EventSubscriber for Collector {
    fn on_event(&self, event: &DomainEvent) {
        if let DomainEvent::EmailConfirmed { email } = event {
            self.seen.lock().unwrap().push(email.clone());
        }
    }
}

fn confirmed(email: &str) -> DomainEvent {
    DomainEvent::EmailConfirmed {
        email: email.to_string(),
    }
}

fn serialized(id: &str) -> SerializedEvent {
    let event = DomainEvent::WorkshopAdded {
        workshop: Some(WorkshopRecord::unscheduled(WorkshopId::new(id), id, None)),
    };
    SerializedEvent::from_event(&event, None).unwrap()
}

#[test]
fn event_store_pushes_in_publish_order() {
    let store = InMemoryEventStore::new();
    let collector = Arc::new(Collector::default());
    store.subscribe(collector.clone());

    store.publish(&confirmed("a@example.org"));
    store.publish(&confirmed("b@example.org"));

    assert_eq!(*collector.seen.lock().unwrap(), vec!["a@example.org", "b@example.org"]);
    assert_eq!(store.history().len(), 2);
}

#[test]
fn late_subscriber_only_sees_new_events_unless_replayed() {
    let store = InMemoryEventStore::new();
    store.publish(&confirmed("early@example.org"));

    let plain = Arc::new(Collector::default());
    let replayed = Arc::new(Collector::default());
    store.subscribe(plain.clone());
    store.subscribe_with_replay(replayed.clone());
    store.publish(&confirmed("late@example.org"));

    assert_eq!(*plain.seen.lock().unwrap(), vec!["late@example.org"]);
    assert_eq!(
        *replayed.seen.lock().unwrap(),
        vec!["early@example.org", "late@example.org"]
    );
    assert_eq!(store.subscriber_count(), 2);
}

#[tokio::test]
async fn event_bus_delivers_to_subscribers_of_the_topic() {
    let bus = InMemoryEventBus::new();
    let mut events = bus.subscribe(&["workshops"]).await.unwrap();

    assert_ok!(bus.publish("workshops", &serialized("a")).await);
    assert_ok!(bus.publish("other", &serialized("ignored")).await);
    assert_ok!(bus.publish("workshops", &serialized("b")).await);

    assert_eq!(events.next().await.unwrap().unwrap(), serialized("a"));
    assert_eq!(events.next().await.unwrap().unwrap(), serialized("b"));
    assert_eq!(bus.topic_count(), 2);
}

#[tokio::test]
async fn event_bus_stream_ends_when_closed() {
    let bus = InMemoryEventBus::new();
    let mut events = bus.subscribe(&["workshops"]).await.unwrap();

    bus.publish("workshops", &serialized("a")).await.unwrap();
    bus.close();

    assert!(events.next().await.unwrap().is_ok());
    assert!(events.next().await.is_none());
    assert!(matches!(
        bus.publish("workshops", &serialized("b")).await,
        Err(EventBusError::PublishFailed { .. })
    ));
    assert!(matches!(
        bus.subscribe(&["workshops"]).await,
        Err(EventBusError::SubscriptionFailed { .. })
    ));
}

#[tokio::test]
async fn slow_subscriber_reports_lag() {
    let bus = InMemoryEventBus::with_capacity(2);
    let mut events = bus.subscribe(&["workshops"]).await.unwrap();

    for id in ["a", "b", "c", "d"] {
        bus.publish("workshops", &serialized(id)).await.unwrap();
    }

    assert!(matches!(events.next().await, Some(Err(EventBusError::Lagged(2)))));
    assert_eq!(events.next().await.unwrap().unwrap(), serialized("c"));
}

#[tokio::test]
async fn subscribing_to_no_topics_fails() {
    let bus = InMemoryEventBus::new();

    assert!(bus.subscribe(&[]).await.is_err());
}
