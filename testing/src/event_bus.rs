//! In-memory event bus backed by tokio broadcast channels.
//!
//! One broadcast channel per topic, created on first use by either side.
//! Subscribing to several topics merges their receivers into one
//! [`EventStream`]. A receiver that falls behind the channel capacity yields
//! [`EventBusError::Lagged`] and keeps going. After [`InMemoryEventBus::close`]
//! open streams end and further publishes or subscriptions fail.

use async_stream::stream;
use confreg_core::event::SerializedEvent;
use confreg_core::event_bus::{EventBus, EventBusError, EventStream};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Default per-topic buffer.
pub const DEFAULT_CAPACITY: usize = 1000;

/// In-memory event bus for tests.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// let mut events = bus.subscribe(&["workshop-events"]).await?;
///
/// bus.publish("workshop-events", &serialized).await?;
/// assert_eq!(events.next().await.unwrap()?, serialized);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryEventBus {
    topics: Arc<RwLock<Topics>>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct Topics {
    senders: HashMap<String, broadcast::Sender<SerializedEvent>>,
    closed: bool,
}

impl InMemoryEventBus {
    /// Create a bus with [`DEFAULT_CAPACITY`] per topic.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with `capacity` buffered events per topic.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(Topics::default())),
            capacity: capacity.max(1),
        }
    }

    /// Close every topic; open streams end once drained.
    pub fn close(&self) {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        topics.closed = true;
        topics.senders.clear();
    }

    /// Number of topics in use.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.read().unwrap_or_else(PoisonError::into_inner).senders.len()
    }

    /// Sender for `topic`, or `None` once the bus is closed.
    fn sender(&self, topic: &str) -> Option<broadcast::Sender<SerializedEvent>> {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        if topics.closed {
            return None;
        }
        let capacity = self.capacity;
        Some(
            topics
                .senders
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(capacity).0)
                .clone(),
        )
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn receiver_stream(
    mut receiver: broadcast::Receiver<SerializedEvent>,
) -> impl futures::Stream<Item = Result<SerializedEvent, EventBusError>> + Send {
    stream! {
        loop {
            match receiver.recv().await {
                Ok(event) => yield Ok(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    yield Err(EventBusError::Lagged(skipped));
                },
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let result = match self.sender(topic) {
            Some(sender) => {
                // Publishing with no subscribers is not an error.
                let _ = sender.send(event.clone());
                Ok(())
            },
            None => Err(EventBusError::PublishFailed {
                topic: topic.to_string(),
                reason: "bus closed".to_string(),
            }),
        };
        Box::pin(async move { result })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let failed = |reason: &str| EventBusError::SubscriptionFailed {
            topics: topics.iter().map(ToString::to_string).collect(),
            reason: reason.to_string(),
        };

        let result = if topics.is_empty() {
            Err(failed("no topics given"))
        } else {
            // Receivers are created here, not lazily, so nothing published
            // after `subscribe` returns can be missed.
            topics
                .iter()
                .map(|topic| {
                    self.sender(topic)
                        .map(|sender| receiver_stream(sender.subscribe()).boxed())
                        .ok_or_else(|| failed("bus closed"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|streams| stream::select_all(streams).boxed())
        };
        Box::pin(async move { result })
    }
}
