//! Event bus abstraction for post-commit side effects.
//!
//! Reducers never call notifiers directly. After a state change commits they
//! return an effect that publishes a [`SerializedEvent`] to a topic; separate
//! consumers subscribe and do the delivery work.
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐
//! │   Reducer   │────▶│  Event Bus  │────▶│ Notification     │
//! │ (commit)    │     │  (topic)    │     │ Dispatcher       │
//! └─────────────┘     └─────────────┘     └──────────────────┘
//! ```
//!
//! Delivery is best-effort: a failed publish is logged by the effect that
//! attempted it and never reaches reducer state.
//!
//! # Implementations
//!
//! - `LocalEventBus` (runtime crate) - in-process tokio broadcast
//! - `RecordingEventBus` / `FailingEventBus` (testing crate)

use crate::event::SerializedEvent;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to subscribe to topics
    #[error("Subscription failed for topics {topics:?}: {reason}")]
    SubscriptionFailed {
        /// The topics that failed to subscribe
        topics: Vec<String>,
        /// The reason for failure
        reason: String,
    },

    /// Subscriber fell behind and events were dropped
    #[error("Subscriber lagged, {0} events skipped")]
    Lagged(u64),
}

/// Stream of events from a subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SerializedEvent, EventBusError>> + Send>>;

/// Publish/subscribe transport.
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so it can be held as
/// `Arc<dyn EventBus>` inside reducer environments and captured by effects.
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the transport rejects the event.
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Subscribe to one or more topics and receive a stream of events.
    ///
    /// Only events published after the subscription is established are
    /// guaranteed to be delivered.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if subscription fails.
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>>;
}
