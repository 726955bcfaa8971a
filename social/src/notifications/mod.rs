//! User-facing notifications.
//!
//! Reducers never deliver notifications themselves. After a change commits
//! they return an effect built by [`publish`], which wraps a fresh
//! [`NotificationEvent`] in a `SerializedEvent` and publishes it on
//! [`NOTIFICATION_TOPIC`]. The [`NotificationDispatcher`] consumes that topic
//! and hands every event to the registered [`Notifier`]s.
//!
//! Delivery is best-effort. A failed publish is logged at `warn` and the
//! state change that triggered it stays committed.

mod dispatcher;
mod notifier;

pub use dispatcher::NotificationDispatcher;
pub use notifier::{DeliveryFuture, InboxNotifier, NotificationError, Notifier, SocketMessage, SocketNotifier};

use crate::environment::SocialEnvironment;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use gatherly_core::effect::Effect;
use gatherly_core::event::{Event, SerializedEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Topic every notification is published on
pub const NOTIFICATION_TOPIC: &str = "notifications";

/// Type name carried by serialized notification events
pub const NOTIFICATION_EVENT_TYPE: &str = "Notification.v1";

/// Category shown next to a notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationTag {
    /// Someone followed the recipient
    Follower,
    /// An RSVP was recorded or refused
    Rsvp,
    /// A new event was created
    New,
    /// An event changed
    Update,
    /// An event was removed
    Deleted,
    /// The recipient's account was activated
    Activate,
}

impl fmt::Display for NotificationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Follower => "Follower",
            Self::Rsvp => "RSVP",
            Self::New => "New!",
            Self::Update => "Update",
            Self::Deleted => "Deleted",
            Self::Activate => "Activate",
        };
        f.write_str(label)
    }
}

/// Real-time channel a notification is announced on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// `New follower`
    NewFollower,
    /// `rsvp done`
    RsvpDone,
    /// `already rsvp`
    AlreadyRsvp,
    /// `new event created`
    NewEvent,
    /// `event update`
    EventUpdate,
    /// `event deleted`
    EventDeleted,
    /// `Account activate`
    AccountActivate,
}

impl Channel {
    /// The wire name of the channel
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewFollower => "New follower",
            Self::RsvpDone => "rsvp done",
            Self::AlreadyRsvp => "already rsvp",
            Self::NewEvent => "new event created",
            Self::EventUpdate => "event update",
            Self::EventDeleted => "event deleted",
            Self::AccountActivate => "Account activate",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heading, content and tag of one notification
///
/// Built fresh for each emission and never shared between requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Short heading
    pub heading: String,
    /// Body text
    pub content: String,
    /// Category
    pub tag: NotificationTag,
}

impl Notification {
    /// Creates a notification
    #[must_use]
    pub fn new(heading: impl Into<String>, content: impl Into<String>, tag: NotificationTag) -> Self {
        Self {
            heading: heading.into(),
            content: content.into(),
            tag,
        }
    }

    /// "New follower!"
    #[must_use]
    pub fn new_follower(follower_first_name: &str) -> Self {
        Self::new(
            "New follower!",
            format!("{follower_first_name} started following you!"),
            NotificationTag::Follower,
        )
    }

    /// "RSVP done!"
    #[must_use]
    pub fn rsvp_done() -> Self {
        Self::new("RSVP done!", "RSVP successfully done!", NotificationTag::Rsvp)
    }

    /// "Already rsvp!"
    #[must_use]
    pub fn already_rsvp() -> Self {
        Self::new(
            "Already rsvp!",
            "You have already done the rsvp",
            NotificationTag::Rsvp,
        )
    }

    /// "New Event!"
    #[must_use]
    pub fn new_event(name: &str) -> Self {
        Self::new("New Event!", format!("{name} is added!"), NotificationTag::New)
    }

    /// "Event update!"
    #[must_use]
    pub fn event_updated(name: &str) -> Self {
        Self::new(
            "Event update!",
            format!("{name} is updated!"),
            NotificationTag::Update,
        )
    }

    /// "Event deleted!"
    #[must_use]
    pub fn event_deleted(name: &str) -> Self {
        Self::new(
            "Event deleted!",
            format!("Event {name} is deleted!"),
            NotificationTag::Deleted,
        )
    }

    /// "Account activate!"
    #[must_use]
    pub fn account_activated() -> Self {
        Self::new(
            "Account activate!",
            "Account successfully activated!",
            NotificationTag::Activate,
        )
    }
}

/// Who a notification is for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Audience {
    /// One user
    User(UserId),
    /// Every user
    Everyone,
}

/// A notification in transit on the event bus
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Recipient(s)
    pub audience: Audience,
    /// Real-time channel
    pub channel: Channel,
    /// What to show
    pub notification: Notification,
    /// When the triggering change committed
    pub issued_at: DateTime<Utc>,
}

impl Event for NotificationEvent {
    fn event_type(&self) -> &'static str {
        NOTIFICATION_EVENT_TYPE
    }
}

/// Effect publishing one notification after the current change commits
///
/// Encoding or publish failures are logged and dropped.
pub fn publish(
    env: &SocialEnvironment,
    audience: Audience,
    channel: Channel,
    notification: Notification,
) -> Effect {
    let event = NotificationEvent {
        audience,
        channel,
        notification,
        issued_at: env.clock.now(),
    };
    let bus = Arc::clone(&env.event_bus);

    Effect::detached(async move {
        let serialized = match SerializedEvent::from_event(&event) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!(%error, channel = %event.channel, "Failed to encode notification");
                return;
            },
        };
        if let Err(error) = bus.publish(NOTIFICATION_TOPIC, &serialized).await {
            tracing::warn!(%error, channel = %event.channel, "Failed to publish notification");
        }
    })
}
