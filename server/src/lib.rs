//! # Conference Registration Server
//!
//! Startup and lifecycle of the registration service's in-process core:
//!
//! 1. Install the Prometheus recorder (optional)
//! 2. Load the workshop feed into the catalog; a bad feed stops startup
//! 3. Pick the mail transport (SMTP when configured, console otherwise)
//! 4. Spawn the notification dispatcher
//!
//! Request handlers get the catalog and the notification queue from the
//! running [`Application`]; the event store is attached through
//! [`Application::attach_event_store`] or [`Application::follow_event_bus`].
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ServerConfig::from_env()?;
//! let app = Application::start(&config).await?;
//!
//! app.attach_event_store(&event_store);
//! let queue = app.notifications();
//!
//! tokio::signal::ctrl_c().await?;
//! app.shutdown().await;
//! ```

pub mod config;

use confreg_catalog::{CatalogSubscription, FeedError, FeedSource, WorkshopCatalog};
use confreg_core::event_bus::EventBus;
use confreg_core::projection::{self, ProjectionError};
use confreg_core::subscription::EventSubscription;
use confreg_runtime::metrics::{MetricsError, MetricsServer};
use confreg_runtime::{
    ConsoleMailTransport, Dispatcher, DispatcherHandle, MailTransport, NotificationQueue, OutboundMail,
    SmtpMailTransport, TransportError,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use config::{ConfigError, FeedConfig, ServerConfig, SmtpSettings};

/// Reasons the service refuses to start.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The environment holds malformed settings.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The workshop feed is misconfigured, unreachable or malformed.
    #[error("Workshop feed could not be loaded: {0}")]
    Feed(#[from] FeedError),

    /// The SMTP transport could not be configured.
    #[error("Mail transport could not be configured: {0}")]
    Transport(#[from] TransportError),

    /// The metrics exporter could not be installed.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// The transport selected from configuration.
#[derive(Clone)]
pub enum ServiceTransport {
    /// Real mail through an SMTP relay.
    Smtp(SmtpMailTransport),
    /// Log only.
    Console(ConsoleMailTransport),
}

impl ServiceTransport {
    /// SMTP when `settings` is present, console otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the SMTP settings are unusable.
    pub fn from_settings(settings: Option<&SmtpSettings>) -> Result<Self, TransportError> {
        match settings {
            Some(settings) => Ok(Self::Smtp(SmtpMailTransport::new(settings.to_transport_config())?)),
            None => {
                tracing::warn!("SMTP_HOST not set, notifications will only be logged");
                Ok(Self::Console(ConsoleMailTransport::new()))
            },
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Smtp(_) => "smtp",
            Self::Console(_) => "console",
        }
    }
}

impl MailTransport for ServiceTransport {
    async fn deliver(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        match self {
            Self::Smtp(transport) => transport.deliver(mail).await,
            Self::Console(transport) => transport.deliver(mail).await,
        }
    }
}

/// A catalog subscription running on the event bus.
struct BusFollower {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<projection::Result<u64>>,
}

/// The running service core.
pub struct Application {
    catalog: Arc<WorkshopCatalog>,
    notifications: NotificationQueue,
    dispatcher: DispatcherHandle,
    followers: Vec<BusFollower>,
    metrics: Option<MetricsServer>,
}

impl Application {
    /// Start the service core from `config`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] if the metrics exporter, the feed or the mail
    /// transport cannot be set up.
    pub async fn start(config: &ServerConfig) -> Result<Self, StartupError> {
        let metrics = match config.metrics_addr {
            Some(addr) => {
                let mut server = MetricsServer::new(addr);
                server.start()?;
                Some(server)
            },
            None => None,
        };

        let source = FeedSource::resolve(config.feed.location.as_deref(), config.feed.file.as_deref())?;
        let catalog = match WorkshopCatalog::load(&source).await {
            Ok(catalog) => Arc::new(catalog),
            Err(e) => {
                tracing::error!(
                    source = %source,
                    configuration = e.is_configuration(),
                    error = %e,
                    "Workshop feed could not be loaded"
                );
                return Err(e.into());
            },
        };

        let transport = ServiceTransport::from_settings(config.smtp.as_ref())?;
        tracing::info!(
            transport = transport.name(),
            environment = %config.dispatcher.environment,
            "Starting notification dispatcher"
        );
        let (notifications, dispatcher) = Dispatcher::spawn(transport, config.dispatcher.clone());

        Ok(Self {
            catalog,
            notifications,
            dispatcher,
            followers: Vec::new(),
            metrics,
        })
    }

    /// The workshop catalog.
    #[must_use]
    pub fn catalog(&self) -> Arc<WorkshopCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Producer handle for outbound notifications.
    #[must_use]
    pub fn notifications(&self) -> NotificationQueue {
        self.notifications.clone()
    }

    /// Current Prometheus payload, if this instance installed the recorder.
    #[must_use]
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics.as_ref().and_then(MetricsServer::render)
    }

    /// Register the catalog with an event store that pushes events.
    pub fn attach_event_store(&self, store: &dyn EventSubscription) {
        store.subscribe(self.catalog());
        tracing::info!("Catalog subscribed to event store");
    }

    /// Keep the catalog current from `topic` on `event_bus`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the bus refuses the subscription.
    pub async fn follow_event_bus(
        &mut self,
        event_bus: Arc<dyn EventBus>,
        topic: &str,
    ) -> Result<(), ProjectionError> {
        let (subscription, shutdown) = CatalogSubscription::subscribe(self.catalog(), event_bus, topic).await?;
        let task = tokio::spawn(subscription.run());
        self.followers.push(BusFollower { shutdown, task });
        Ok(())
    }

    /// Stop background work.
    ///
    /// Bus subscriptions stop first, then the dispatcher. Returns the number
    /// of notifications abandoned.
    pub async fn shutdown(self) -> usize {
        for follower in self.followers {
            let _ = follower.shutdown.send(true);
            match follower.task.await {
                Ok(Ok(applied)) => tracing::debug!(applied, "Catalog subscription finished"),
                Ok(Err(e)) => tracing::error!(error = %e, "Catalog subscription failed"),
                Err(e) => tracing::error!(error = %e, "Catalog subscription task failed"),
            }
        }

        self.dispatcher.shutdown().await
    }
}
