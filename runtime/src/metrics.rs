//! Prometheus metrics for the catalog and the notification dispatcher.
//!
//! Metric names:
//! - `catalog_*`: seeding and event application in the workshop catalog
//! - `notifications_*` / `notification_*`: queue depth, delivery outcomes
//!   and latency
//!
//! # Example
//!
//! ```rust,no_run
//! use confreg_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! # Ok(())
//! # }
//! ```

use crate::error::TransportError;
use confreg_core::notification::NotificationKind;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server for `addr` (e.g., `0.0.0.0:9090`).
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Describe all metrics, install the Prometheus recorder and serve
    /// `/metrics` on the configured address.
    ///
    /// Must be called from within a tokio runtime. An already installed
    /// recorder (several servers in one test binary) is tolerated with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the exporter cannot be built.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .with_http_listener(self.addr)
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
            return Ok(());
        }

        let addr = self.addr;
        tokio::spawn(async move {
            if exporter.await.is_err() {
                tracing::error!(%addr, "Metrics endpoint stopped");
            }
        });
        self.handle = Some(handle);
        tracing::info!(%addr, "Metrics available at http://{addr}/metrics");
        Ok(())
    }

    /// Address the scrape endpoint binds to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Catalog
    describe_counter!(
        "catalog_workshops_seeded_total",
        "Total number of workshops loaded from the feed"
    );
    describe_counter!(
        "catalog_events_applied_total",
        "Total number of events that added a workshop"
    );
    describe_counter!(
        "catalog_events_ignored_total",
        "Total number of events the catalog did not act on"
    );

    // Notifications
    describe_counter!(
        "notifications_enqueued_total",
        "Total number of notifications accepted by the queue"
    );
    describe_counter!(
        "notifications_delivered_total",
        "Total number of notifications handed to the transport successfully"
    );
    describe_counter!(
        "notifications_failed_total",
        "Total number of notifications dropped after a delivery error"
    );
    describe_counter!(
        "notifications_abandoned_total",
        "Total number of pending notifications discarded at shutdown"
    );
    describe_gauge!(
        "notification_queue_depth",
        "Current number of pending notifications"
    );
    describe_histogram!(
        "notification_delivery_duration_seconds",
        "Time taken to deliver one notification"
    );
}

/// Notification dispatcher metrics recorder.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record a message accepted by the queue.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_enqueued(kind: NotificationKind, depth: usize) {
        counter!("notifications_enqueued_total", "kind" => kind.as_label()).increment(1);
        gauge!("notification_queue_depth").set(depth as f64);
    }

    /// Record the queue depth after a pop.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_queue_depth(depth: usize) {
        gauge!("notification_queue_depth").set(depth as f64);
    }

    /// Record a successful delivery.
    pub fn record_delivered(kind: NotificationKind, duration: Duration) {
        counter!("notifications_delivered_total", "kind" => kind.as_label()).increment(1);
        histogram!("notification_delivery_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a dropped message.
    pub fn record_failed(kind: NotificationKind, error: &TransportError) {
        counter!(
            "notifications_failed_total",
            "kind" => kind.as_label(),
            "reason" => error.as_label()
        )
        .increment(1);
    }

    /// Record messages discarded at shutdown.
    pub fn record_abandoned(count: usize) {
        counter!("notifications_abandoned_total").increment(count as u64);
        gauge!("notification_queue_depth").set(0.0);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert_eq!(server.addr(), addr);
    }

    #[tokio::test]
    async fn test_notification_metrics_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        NotificationMetrics::record_enqueued(NotificationKind::Waitlisted, 1);
        NotificationMetrics::record_delivered(NotificationKind::Waitlisted, Duration::from_millis(40));
        NotificationMetrics::record_failed(
            NotificationKind::Cancellation,
            &TransportError::Timeout(Duration::from_secs(30)),
        );

        // Another test in this binary may own the recorder; metrics are
        // still recorded globally in that case.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("notifications_enqueued_total"));
            assert!(rendered.contains("notifications_delivered_total"));
            assert!(rendered.contains("reason=\"transport_timeout\""));
        }
    }
}
