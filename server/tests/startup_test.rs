//! Startup sequence tests.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use confreg_catalog::FeedError;
use confreg_core::event::{DomainEvent, SerializedEvent};
use confreg_core::event_bus::EventBus;
use confreg_core::notification::{NotificationKind, NotificationMessage};
use confreg_core::workshop::{WorkshopId, WorkshopRecord};
use confreg_runtime::DispatcherConfig;
use confreg_server::{Application, FeedConfig, ServerConfig, SmtpSettings, StartupError};
use confreg_testing::{FeedBuilder, InMemoryEventBus, InMemoryEventStore, init_test_tracing};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn config(feed: FeedConfig) -> ServerConfig {
    ServerConfig {
        feed,
        dispatcher: DispatcherConfig::default(),
        smtp: None,
        metrics_addr: None,
    }
}

fn feed_file(builder: &FeedBuilder) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&builder.build()).unwrap();
    file
}

fn added(id: &str) -> DomainEvent {
    DomainEvent::WorkshopAdded {
        workshop: Some(WorkshopRecord::unscheduled(WorkshopId::new(id), id, None)),
    }
}

#[tokio::test]
async fn unconfigured_feed_starts_with_an_empty_catalog() {
    init_test_tracing();
    let app = Application::start(&config(FeedConfig::default())).await.unwrap();

    assert!(app.catalog().is_empty());
    assert!(app.render_metrics().is_none());

    let message =
        NotificationMessage::new(NotificationKind::EmailVerification, "ada@example.org", "Please confirm").unwrap();
    app.notifications().enqueue(message).unwrap();

    // Default interval is 5s, so the message is still pending.
    assert_eq!(app.shutdown().await, 1);
}

#[tokio::test]
async fn feed_file_seeds_the_catalog() {
    let file = feed_file(&FeedBuilder::new().workshop("a", "A").draft("b", "B").workshop("c", "C"));
    let app = Application::start(&config(FeedConfig {
        location: Some("https://feed.example.org/workshops".to_string()),
        file: Some(file.path().to_path_buf()),
    }))
    .await
    .unwrap();

    assert_eq!(app.catalog().len(), 2);
    assert_eq!(app.shutdown().await, 0);
}

#[tokio::test]
async fn broken_feed_stops_startup() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{\"collection\": 42}").unwrap();

    let result = Application::start(&config(FeedConfig {
        location: Some(file.path().to_string_lossy().into_owned()),
        file: None,
    }))
    .await;

    assert!(matches!(result, Err(StartupError::Feed(FeedError::Parse(_)))));
}

#[tokio::test]
async fn unsupported_feed_scheme_stops_startup() {
    let result = Application::start(&config(FeedConfig {
        location: Some("ftp://feed.example.org/workshops".to_string()),
        file: None,
    }))
    .await;

    assert!(matches!(
        result,
        Err(StartupError::Feed(FeedError::InvalidLocation { .. }))
    ));
}

#[tokio::test]
async fn bad_sender_address_stops_startup() {
    let mut config = config(FeedConfig::default());
    config.smtp = Some(SmtpSettings {
        host: "localhost".to_string(),
        port: 25,
        use_ssl: false,
        user: None,
        password: None,
        from: "not-an-address".to_string(),
        bcc: Vec::new(),
    });

    let result = Application::start(&config).await;

    assert!(matches!(result, Err(StartupError::Transport(_))));
}

#[tokio::test]
async fn pushed_events_reach_the_catalog() {
    let file = feed_file(&FeedBuilder::new().workshop("a", "A").workshop("b", "B"));
    let app = Application::start(&config(FeedConfig {
        location: Some("https://feed.example.org/workshops".to_string()),
        file: Some(file.path().to_path_buf()),
    }))
    .await
    .unwrap();
    let store = InMemoryEventStore::new();

    app.attach_event_store(&store);
    store.publish(&added("new-ws"));

    assert_eq!(app.catalog().len(), 3);
    assert!(app.catalog().by_id("new-ws").is_some());
    app.shutdown().await;
}

#[tokio::test]
async fn bus_events_reach_the_catalog_and_stop_on_shutdown() {
    let mut app = Application::start(&config(FeedConfig::default())).await.unwrap();
    let bus = Arc::new(InMemoryEventBus::new());

    app.follow_event_bus(bus.clone(), "workshop-events").await.unwrap();
    bus.publish("workshop-events", &SerializedEvent::from_event(&added("x"), None).unwrap())
        .await
        .unwrap();

    let catalog = app.catalog();
    tokio::time::timeout(Duration::from_secs(5), async {
        while catalog.is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("event should be applied");

    tokio::time::timeout(Duration::from_secs(5), app.shutdown())
        .await
        .expect("shutdown should not hang");
    assert_eq!(catalog.len(), 1);
}
