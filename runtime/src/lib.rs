//! # Conference Registration Runtime
//!
//! Asynchronous notification delivery for the conference registration
//! service.
//!
//! ## Core Components
//!
//! - **Dispatcher**: an owned FIFO queue drained by one background worker
//! - **Transports**: SMTP (Lettre) for real mail, console for development
//! - **Metrics**: Prometheus exporter and recorders
//!
//! ## Example
//!
//! ```ignore
//! use confreg_runtime::{ConsoleMailTransport, Dispatcher, DispatcherConfig};
//!
//! let (queue, handle) = Dispatcher::spawn(ConsoleMailTransport::new(), DispatcherConfig::default());
//!
//! // From a request handler; returns immediately.
//! queue.enqueue(message)?;
//!
//! // At process shutdown:
//! let abandoned = handle.shutdown().await;
//! ```

/// Notification queue, worker and lifecycle handle
pub mod dispatcher;

/// Error types for dispatching and delivery
pub mod error;

/// Prometheus metrics for observability
pub mod metrics;

/// Transport trait and final payload rendering
pub mod transport;

/// Console transport
pub mod console;

/// SMTP transport
pub mod smtp;

pub use console::ConsoleMailTransport;
pub use dispatcher::{
    Dispatcher, DispatcherConfig, DispatcherHandle, NotificationQueue, NotificationWorker, WakeOutcome,
};
pub use error::{DispatchError, TransportError};
pub use smtp::{SmtpConfig, SmtpMailTransport};
pub use transport::{MailTransport, OutboundMail};
