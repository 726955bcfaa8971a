//! Consumer of the notification topic.

use super::{Audience, NotificationEvent, Notifier, NOTIFICATION_EVENT_TYPE, NOTIFICATION_TOPIC};
use futures::StreamExt;
use gatherly_core::event_bus::{EventBus, EventBusError, EventStream};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Reads [`NotificationEvent`]s off the bus and hands each to every notifier
///
/// Undecodable events and notifier failures are logged and skipped; nothing
/// here can fail the change that produced the notification.
#[derive(Clone)]
pub struct NotificationDispatcher {
    bus: Arc<dyn EventBus>,
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher with no notifiers yet
    #[must_use]
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self {
            bus,
            notifiers: Vec::new(),
        }
    }

    /// Register a notifier
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Subscribe and dispatch until the subscription ends
    ///
    /// Returns the number of notifications dispatched.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the subscription cannot be established.
    pub async fn run(&self) -> Result<usize, EventBusError> {
        let stream = self.bus.subscribe(&[NOTIFICATION_TOPIC]).await?;
        Ok(self.drain(stream).await)
    }

    /// Subscribe now and dispatch on a background task
    ///
    /// The subscription exists before this returns, so nothing published
    /// afterwards is missed.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the subscription cannot be established.
    pub async fn start(self) -> Result<JoinHandle<usize>, EventBusError> {
        let stream = self.bus.subscribe(&[NOTIFICATION_TOPIC]).await?;
        tracing::info!(notifiers = self.notifiers.len(), "Notification dispatcher started");
        Ok(tokio::spawn(async move { self.drain(stream).await }))
    }

    async fn drain(&self, mut stream: EventStream) -> usize {
        let mut dispatched = 0;
        while let Some(item) = stream.next().await {
            let serialized = match item {
                Ok(serialized) => serialized,
                Err(error) => {
                    tracing::warn!(%error, "Notification stream error");
                    continue;
                },
            };
            match serialized.decode::<NotificationEvent>(NOTIFICATION_EVENT_TYPE) {
                Ok(event) => {
                    self.dispatch(&event).await;
                    dispatched += 1;
                },
                Err(error) => {
                    tracing::warn!(%error, event_type = %serialized.event_type, "Skipping undecodable notification");
                },
            }
        }
        tracing::debug!(dispatched, "Notification stream ended");
        dispatched
    }

    async fn dispatch(&self, event: &NotificationEvent) {
        for notifier in &self.notifiers {
            let result = match event.audience {
                Audience::User(user) => {
                    notifier
                        .notify_user(user, event.channel, &event.notification)
                        .await
                },
                Audience::Everyone => notifier.notify_all(event.channel, &event.notification).await,
            };
            if let Err(error) = result {
                tracing::warn!(%error, channel = %event.channel, "Notifier failed");
            }
        }
        tracing::debug!(channel = %event.channel, "Notification dispatched");
    }
}
