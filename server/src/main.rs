//! Conference registration service.
//!
//! Loads the workshop catalog, runs the notification dispatcher and waits
//! for Ctrl-C.

use anyhow::Context;
use confreg_server::{Application, ServerConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confreg=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting conference registration service");

    let config = ServerConfig::from_env().context("Invalid configuration")?;
    info!(
        feed_location = ?config.feed.location,
        feed_file = ?config.feed.file,
        environment = %config.dispatcher.environment,
        poll_interval = ?config.dispatcher.poll_interval,
        smtp = config.smtp.is_some(),
        "Configuration loaded"
    );

    let app = Application::start(&config)
        .await
        .context("Service failed to start")?;
    info!(workshops = app.catalog().len(), "Service running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    let abandoned = app.shutdown().await;
    info!(abandoned, "Service stopped");

    Ok(())
}
