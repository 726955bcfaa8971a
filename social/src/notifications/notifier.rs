//! Delivery targets for notifications.

use super::{Audience, Channel, Notification};
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast;

/// Delivery failure reported by a [`Notifier`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The target rejected the notification
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Future returned by [`Notifier`] methods
pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + 'a>>;

/// Something that can put a notification in front of users
///
/// Best-effort: callers log failures and move on.
pub trait Notifier: Send + Sync {
    /// Deliver to one user
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Delivery`] if the target refuses it.
    fn notify_user(
        &self,
        user: UserId,
        channel: Channel,
        notification: &Notification,
    ) -> DeliveryFuture<'_>;

    /// Deliver to every user
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Delivery`] if the target refuses it.
    fn notify_all(&self, channel: Channel, notification: &Notification) -> DeliveryFuture<'_>;
}

#[derive(Debug, Default)]
struct Inboxes {
    personal: HashMap<UserId, VecDeque<Notification>>,
    broadcasts: VecDeque<Notification>,
}

/// Per-user notification inboxes kept in memory
///
/// Each inbox holds at most `limit` notifications and drops the oldest first.
/// Broadcasts go to a shared list with the same limit.
#[derive(Debug, Clone)]
pub struct InboxNotifier {
    limit: usize,
    inboxes: Arc<Mutex<Inboxes>>,
}

impl InboxNotifier {
    /// Creates inboxes holding at most `limit` entries each
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            inboxes: Arc::new(Mutex::new(Inboxes::default())),
        }
    }

    /// Notifications addressed to `user`, oldest first
    #[must_use]
    pub fn inbox(&self, user: &UserId) -> Vec<Notification> {
        self.inboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .personal
            .get(user)
            .map(|inbox| inbox.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Notifications addressed to everyone, oldest first
    #[must_use]
    pub fn broadcasts(&self) -> Vec<Notification> {
        self.inboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .broadcasts
            .iter()
            .cloned()
            .collect()
    }

    fn push(list: &mut VecDeque<Notification>, notification: Notification, limit: usize) {
        list.push_back(notification);
        while list.len() > limit {
            list.pop_front();
        }
    }
}

impl Notifier for InboxNotifier {
    fn notify_user(
        &self,
        user: UserId,
        _channel: Channel,
        notification: &Notification,
    ) -> DeliveryFuture<'_> {
        {
            let mut inboxes = self.inboxes.lock().unwrap_or_else(PoisonError::into_inner);
            let inbox = inboxes.personal.entry(user).or_default();
            Self::push(inbox, notification.clone(), self.limit);
        }
        Box::pin(async { Ok(()) })
    }

    fn notify_all(&self, _channel: Channel, notification: &Notification) -> DeliveryFuture<'_> {
        {
            let mut inboxes = self.inboxes.lock().unwrap_or_else(PoisonError::into_inner);
            Self::push(&mut inboxes.broadcasts, notification.clone(), self.limit);
        }
        Box::pin(async { Ok(()) })
    }
}

/// Message pushed to real-time socket subscribers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketMessage {
    /// Channel name, for example `rsvp done`
    pub channel: String,
    /// Recipient(s)
    pub audience: Audience,
    /// Payload
    pub data: Notification,
}

/// Fans notifications out to connected sockets via a tokio broadcast
///
/// Each connection calls [`SocketNotifier::subscribe`] and filters on the
/// audience. Having no connected sockets is not an error.
#[derive(Debug, Clone)]
pub struct SocketNotifier {
    sender: broadcast::Sender<SocketMessage>,
}

impl SocketNotifier {
    /// Creates a notifier buffering `capacity` messages per connection
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attach a new connection
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SocketMessage> {
        self.sender.subscribe()
    }

    fn emit(&self, message: SocketMessage) {
        if self.sender.send(message).is_err() {
            tracing::trace!("No socket connections for notification");
        }
    }
}

impl Notifier for SocketNotifier {
    fn notify_user(
        &self,
        user: UserId,
        channel: Channel,
        notification: &Notification,
    ) -> DeliveryFuture<'_> {
        self.emit(SocketMessage {
            channel: channel.as_str().to_string(),
            audience: Audience::User(user),
            data: notification.clone(),
        });
        Box::pin(async { Ok(()) })
    }

    fn notify_all(&self, channel: Channel, notification: &Notification) -> DeliveryFuture<'_> {
        self.emit(SocketMessage {
            channel: channel.as_str().to_string(),
            audience: Audience::Everyone,
            data: notification.clone(),
        });
        Box::pin(async { Ok(()) })
    }
}
