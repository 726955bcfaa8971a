//! Application coordinator: wires stores, managers and notification fan-out.
//!
//! One store per document kind (users, events, posts), all sharing a single
//! [`SocialEnvironment`]. Managers are cheap handles onto those stores.

use crate::config::Config;
use crate::environment::SocialEnvironment;
use crate::events::{EventManager, EventReducer, EventState, EventStore, RsvpManager};
use crate::identity::{AccountManager, RelationshipManager, UserReducer, UserState, UserStore};
use crate::notifications::{InboxNotifier, NotificationDispatcher, SocketNotifier};
use crate::posts::{PostManager, PostReducer, PostState, PostStore};
use gatherly_core::environment::{Clock, SystemClock};
use gatherly_core::event_bus::EventBus;
use gatherly_runtime::{LocalEventBus, StoreError};
use std::sync::Arc;

/// The whole backend, in process
#[derive(Clone)]
pub struct App {
    config: Config,
    environment: SocialEnvironment,
    users: UserStore,
    events: EventStore,
    posts: PostStore,
    inbox: InboxNotifier,
    sockets: SocketNotifier,
}

impl App {
    /// Build the app on the system clock and an in-process event bus
    #[must_use]
    pub fn new(config: Config) -> Self {
        let bus = LocalEventBus::with_capacity(config.notifications.bus_capacity);
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(bus))
    }

    /// Build the app on a caller-supplied clock and event bus
    #[must_use]
    pub fn with_parts(config: Config, clock: Arc<dyn Clock>, bus: Arc<dyn EventBus>) -> Self {
        let environment = SocialEnvironment::new(clock, bus);
        let users = UserStore::new(UserState::new(), UserReducer::new(), environment.clone());
        let events = EventStore::new(
            EventState::new(),
            EventReducer::with_policy(config.rsvp.into()),
            environment.clone(),
        );
        let posts = PostStore::new(PostState::new(), PostReducer::new(), environment.clone());

        tracing::info!(
            allow_response_change = config.rsvp.allow_response_change,
            "Gatherly stores initialised"
        );

        Self {
            inbox: InboxNotifier::new(config.notifications.inbox_limit),
            sockets: SocketNotifier::new(config.notifications.socket_capacity),
            config,
            environment,
            users,
            events,
            posts,
        }
    }

    /// Loaded configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Registration, profile edits, activation, deletion
    #[must_use]
    pub fn accounts(&self) -> AccountManager {
        AccountManager::new(self.users.clone())
    }

    /// Follow and block relationships
    #[must_use]
    pub fn relationships(&self) -> RelationshipManager {
        RelationshipManager::new(self.users.clone())
    }

    /// Event catalogue
    #[must_use]
    pub fn events(&self) -> EventManager {
        EventManager::new(self.events.clone(), Arc::clone(&self.environment.clock))
    }

    /// Event responses
    #[must_use]
    pub fn rsvp(&self) -> RsvpManager {
        RsvpManager::new(self.events.clone())
    }

    /// Posts and votes
    #[must_use]
    pub fn posts(&self) -> PostManager {
        PostManager::new(self.posts.clone())
    }

    /// In-memory inboxes fed by the dispatcher
    #[must_use]
    pub const fn inbox(&self) -> &InboxNotifier {
        &self.inbox
    }

    /// Real-time socket fan-out fed by the dispatcher
    #[must_use]
    pub const fn sockets(&self) -> &SocketNotifier {
        &self.sockets
    }

    /// A dispatcher delivering to the app's inbox and socket notifiers
    #[must_use]
    pub fn notification_dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(Arc::clone(&self.environment.event_bus))
            .with_notifier(Arc::new(self.inbox.clone()))
            .with_notifier(Arc::new(self.sockets.clone()))
    }

    /// Wait until every store has finished publishing notifications
    ///
    /// Publishing is not delivery: a running dispatcher may still be handing
    /// the last notifications to its notifiers when this returns.
    pub async fn settle(&self) {
        self.users.settle().await;
        self.events.settle().await;
        self.posts.settle().await;
    }

    /// Stop accepting changes and drain running effects
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError::ShutdownTimeout`] hit.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        let timeout = self.config.shutdown_timeout();
        let (users, events, posts) = tokio::join!(
            self.users.shutdown(timeout),
            self.events.shutdown(timeout),
            self.posts.shutdown(timeout),
        );
        users.and(events).and(posts)
    }
}
