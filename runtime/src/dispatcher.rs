//! Asynchronous notification dispatcher.
//!
//! # Overview
//!
//! Request handlers push rendered messages onto a [`NotificationQueue`] and
//! return immediately. A single background [`NotificationWorker`] wakes on a
//! fixed interval, pops at most one message and hands it to a
//! [`MailTransport`]:
//!
//! ```text
//! handler ──enqueue──► NotificationQueue ──pop (1 per tick)──► NotificationWorker ──► MailTransport
//! ```
//!
//! # Delivery policy
//!
//! - Strict FIFO: messages are attempted in enqueue order.
//! - At most once: a failed or timed out delivery is logged and dropped.
//!   There is no retry and no dead-letter queue.
//! - One message per wake, so throughput is capped at one message per
//!   `poll_interval`.
//!
//! # Lifecycle
//!
//! [`Dispatcher::spawn`] starts the worker task and returns the producer
//! handle together with a [`DispatcherHandle`]. Calling
//! [`DispatcherHandle::shutdown`] closes the queue, lets an in-flight delivery
//! finish and reports how many pending messages were abandoned. Dropping the
//! handle without calling `shutdown` stops the worker at its next wake and
//! closes the queue, so producers get [`DispatchError::Closed`] instead of
//! filling a queue nobody drains.

use crate::error::{DispatchError, TransportError};
use crate::metrics::NotificationMetrics;
use crate::transport::{MailTransport, OutboundMail};
use confreg_core::environment::Environment;
use confreg_core::notification::NotificationMessage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Dispatcher settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Time between worker wakes.
    pub poll_interval: Duration,
    /// Upper bound on a single delivery. `None` waits for the transport.
    pub delivery_timeout: Option<Duration>,
    /// Controls the non-production subject/body decoration.
    pub environment: Environment,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            delivery_timeout: Some(Duration::from_secs(30)),
            environment: Environment::Test,
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<NotificationMessage>,
    closed: bool,
}

/// Thread-safe FIFO buffer of pending notifications.
///
/// Cloning is cheap; all clones share one buffer. `enqueue` never waits on
/// delivery.
#[derive(Clone, Debug, Default)]
pub struct NotificationQueue {
    state: Arc<Mutex<QueueState>>,
}

impl NotificationQueue {
    /// Create an empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `message` to the tail of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] once the dispatcher has shut down.
    pub fn enqueue(&self, message: NotificationMessage) -> Result<(), DispatchError> {
        let mut state = self.lock();
        if state.closed {
            tracing::warn!(kind = %message.kind(), "Notification rejected, queue is closed");
            return Err(DispatchError::Closed);
        }

        let kind = message.kind();
        state.messages.push_back(message);
        let depth = state.messages.len();
        drop(state);

        NotificationMetrics::record_enqueued(kind, depth);
        tracing::debug!(%kind, depth, "Notification enqueued");
        Ok(())
    }

    /// Number of pending messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    /// `true` when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    /// `true` after shutdown.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Remove the oldest message, if any.
    ///
    /// The emptiness check and the removal happen under one lock.
    pub(crate) fn pop(&self) -> Option<NotificationMessage> {
        let mut state = self.lock();
        let message = state.messages.pop_front();
        if message.is_some() {
            NotificationMetrics::record_queue_depth(state.messages.len());
        }
        message
    }

    /// Close the queue and discard whatever is still pending.
    ///
    /// Returns the number of discarded messages.
    pub(crate) fn close(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;
        let abandoned: Vec<_> = state.messages.drain(..).collect();
        drop(state);

        for message in &abandoned {
            tracing::warn!(
                kind = %message.kind(),
                recipient = %message.recipient(),
                "Pending notification abandoned at shutdown"
            );
        }
        NotificationMetrics::record_abandoned(abandoned.len());
        abandoned.len()
    }

    // Every mutation is a single push, pop or drain, so a poisoned guard
    // still holds a consistent deque.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What one wake cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakeOutcome {
    /// The queue was empty.
    Idle,
    /// One message was delivered.
    Delivered,
    /// One message was attempted and dropped after a transport error.
    Failed,
}

/// The single consumer of a [`NotificationQueue`].
pub struct NotificationWorker<T> {
    queue: NotificationQueue,
    transport: T,
    config: DispatcherConfig,
}

impl<T> NotificationWorker<T>
where
    T: MailTransport,
{
    /// Create a worker draining `queue` into `transport`.
    #[must_use]
    pub const fn new(queue: NotificationQueue, transport: T, config: DispatcherConfig) -> Self {
        Self {
            queue,
            transport,
            config,
        }
    }

    /// Run one wake cycle: pop at most one message and try to deliver it.
    ///
    /// Never fails; a delivery error is logged and the message is dropped.
    pub async fn wake(&self) -> WakeOutcome {
        let Some(message) = self.queue.pop() else {
            return WakeOutcome::Idle;
        };

        let mail = OutboundMail::render(&message, self.config.environment);
        let started = Instant::now();

        match self.deliver(&mail).await {
            Ok(()) => {
                NotificationMetrics::record_delivered(mail.kind, started.elapsed());
                tracing::info!(kind = %mail.kind, recipient = %mail.to, "Notification delivered");
                WakeOutcome::Delivered
            },
            Err(e) => {
                NotificationMetrics::record_failed(mail.kind, &e);
                tracing::error!(
                    kind = %mail.kind,
                    recipient = %mail.to,
                    error = %e,
                    "Notification delivery failed, message dropped"
                );
                WakeOutcome::Failed
            },
        }
    }

    /// Wake every `poll_interval` until `shutdown` turns `true` or its
    /// sender is dropped.
    ///
    /// The first wake happens one full interval after start. Ticks missed
    /// during a slow delivery are delayed, not replayed in a burst.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        // tokio intervals reject a zero period
        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        tracing::info!(
            poll_interval = ?period,
            environment = %self.config.environment,
            "Notification worker started"
        );

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.wake().await;
                },
            }
        }

        tracing::info!("Notification worker stopped");
    }

    async fn deliver(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        match self.config.delivery_timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.deliver(mail))
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => self.transport.deliver(mail).await,
        }
    }
}

/// Entry point for starting the dispatcher.
pub struct Dispatcher;

impl Dispatcher {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// Returns the producer handle and the lifecycle handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn<T>(transport: T, config: DispatcherConfig) -> (NotificationQueue, DispatcherHandle)
    where
        T: MailTransport + 'static,
    {
        let queue = NotificationQueue::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = NotificationWorker::new(queue.clone(), transport, config);
        let task = tokio::spawn(worker.run(shutdown_rx));

        let handle = DispatcherHandle {
            queue: queue.clone(),
            shutdown: shutdown_tx,
            task,
        };
        (queue, handle)
    }
}

/// Owns the running worker.
///
/// The worker lives as long as this handle. Dropping it stops the worker and
/// closes the queue.
#[derive(Debug)]
#[must_use = "dropping the handle stops the notification worker"]
pub struct DispatcherHandle {
    queue: NotificationQueue,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Stop the worker.
    ///
    /// Closes the queue to new messages, waits for an in-flight delivery to
    /// finish and returns the number of pending messages that were
    /// abandoned.
    pub async fn shutdown(mut self) -> usize {
        tracing::info!("Shutting down notification dispatcher");
        // The worker may already be gone; closing the queue still applies.
        let _ = self.shutdown.send(true);
        let abandoned = self.queue.close();

        if let Err(e) = (&mut self.task).await {
            tracing::error!(error = %e, "Notification worker task failed");
        }

        tracing::info!(abandoned, "Notification dispatcher stopped");
        abandoned
    }

    /// `true` once the worker task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        if self.queue.is_closed() {
            return;
        }
        let _ = self.shutdown.send(true);
        let abandoned = self.queue.close();
        tracing::warn!(abandoned, "Dispatcher handle dropped without shutdown, queue closed");
    }
}
