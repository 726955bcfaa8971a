//! Event trait and the serialized form carried by the event bus.
//!
//! Anything a reducer publishes after a successful mutation (today: user
//! notifications) implements [`Event`] and travels as a [`SerializedEvent`].
//! Payloads are encoded with `bincode`; the type name travels alongside so a
//! consumer can route before decoding.
//!
//! # Example
//!
//! ```
//! use gatherly_core::event::Event;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum FeedEvent {
//!     PostShared { post_id: String },
//! }
//!
//! impl Event for FeedEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             FeedEvent::PostShared { .. } => "PostShared.v1",
//!         }
//!     }
//! }
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event encoding.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// The payload carries a type name the consumer does not understand.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// A fact that can be published on the event bus.
///
/// `event_type()` returns a stable, versioned identifier such as
/// `"Notification.v1"`. Bump the suffix when the payload shape changes.
pub trait Event: Send + Sync + 'static {
    /// Returns the versioned type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// belong to a different event type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// An event in transit: type name and bincode payload.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "Notification.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(event_type: String, data: Vec<u8>) -> Self {
        Self { event_type, data }
    }

    /// Serialize an [`Event`] into its wire form.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(event: &E) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
        })
    }

    /// Decode the payload, checking the type name first.
    ///
    /// # Errors
    ///
    /// Returns `EventError::UnknownEventType` when `expected` does not match,
    /// or `EventError::DeserializationError` when the payload is malformed.
    pub fn decode<E>(&self, expected: &str) -> Result<E, EventError>
    where
        E: Event + DeserializeOwned,
    {
        if self.event_type != expected {
            return Err(EventError::UnknownEventType(self.event_type.clone()));
        }
        E::from_bytes(&self.data)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}
