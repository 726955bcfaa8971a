//! In-process [`EventBus`] on top of a tokio broadcast channel.
//!
//! Every subscriber receives every event published after it subscribed,
//! filtered down to the topics it asked for. A subscriber that falls more
//! than `capacity` events behind receives an [`EventBusError::Lagged`] item
//! and then continues with the oldest retained event.
//!
//! The stream ends once every clone of the bus has been dropped.

use gatherly_core::event::SerializedEvent;
use gatherly_core::event_bus::{EventBus, EventBusError, EventStream};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::broadcast;

/// Default number of events retained for slow subscribers
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process event bus shared by every store in the application
#[derive(Clone)]
pub struct LocalEventBus {
    sender: broadcast::Sender<(String, SerializedEvent)>,
}

impl LocalEventBus {
    /// Create a bus retaining [`DEFAULT_CAPACITY`] events per subscriber
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with a custom per-subscriber buffer
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus for LocalEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();

        Box::pin(async move {
            let event_type = event.event_type.clone();
            match self.sender.send((topic.clone(), event)) {
                Ok(receivers) => {
                    tracing::debug!(
                        topic = %topic,
                        event_type = %event_type,
                        receivers,
                        "Event published"
                    );
                },
                Err(_) => {
                    // Nobody listening is not a failure for best-effort delivery
                    tracing::debug!(topic = %topic, event_type = %event_type, "Event published with no subscribers");
                },
            }
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|s| (*s).to_string()).collect();
        // Subscribe before returning so no event published afterwards is missed
        let mut rx = self.sender.subscribe();

        Box::pin(async move {
            if topics.is_empty() {
                return Err(EventBusError::SubscriptionFailed {
                    topics,
                    reason: "No topics given".to_string(),
                });
            }

            tracing::info!(topics = ?topics, "Subscribed to topics");

            let stream = async_stream::stream! {
                loop {
                    match rx.recv().await {
                        Ok((topic, event)) => {
                            if topics.iter().any(|t| *t == topic) {
                                yield Ok(event);
                            }
                        },
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Subscriber lagged behind the event bus");
                            yield Err(EventBusError::Lagged(skipped));
                        },
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            };

            Ok(Box::pin(stream) as EventStream)
        })
    }
}
