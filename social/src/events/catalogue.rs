//! Creating, editing, deleting and listing events.

use super::{EventAction, EventStore};
use crate::auth::AuthContext;
use crate::error::SocialError;
use crate::types::{Event, EventId, EventUpdate, NewEvent, Page, Paged, UserId};
use gatherly_core::environment::Clock;
use std::sync::Arc;

/// Typed facade over the event store for the catalogue
///
/// Holds its own clock so "upcoming" is measured against the same time
/// source the reducer stamps events with.
#[derive(Clone)]
pub struct EventManager {
    store: EventStore,
    clock: Arc<dyn Clock>,
}

impl EventManager {
    /// Wraps an event store
    #[must_use]
    pub fn new(store: EventStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn execute(&self, action: EventAction, subject: EventId) -> Result<Event, SocialError> {
        let ((rejection, event), _effects) = self
            .store
            .send_and_inspect(action, move |state| {
                (state.last_rejection.clone(), state.get(&subject).cloned())
            })
            .await?;
        match (rejection, event) {
            (Some(rejection), _) => Err(rejection.into()),
            (None, Some(event)) => Ok(event),
            (None, None) => Err(SocialError::not_found("event", subject)),
        }
    }

    /// Create an event owned by the caller
    ///
    /// # Errors
    ///
    /// [`SocialError::InvalidInput`] for an empty or overlong name, or an id
    /// that is already taken.
    #[tracing::instrument(skip(self, ctx, details), fields(owner = %ctx.user_id))]
    pub async fn create_event(
        &self,
        ctx: &AuthContext,
        id: EventId,
        details: NewEvent,
    ) -> Result<Event, SocialError> {
        let action = EventAction::Create {
            id,
            owner: ctx.user_id,
            details,
        };
        self.execute(action, id).await
    }

    /// Edit an event the caller owns
    ///
    /// # Errors
    ///
    /// [`SocialError::Forbidden`] for anyone but the owner;
    /// [`SocialError::NotFound`] for an unknown event;
    /// [`SocialError::InvalidInput`] for an empty update or a bad name.
    #[tracing::instrument(skip(self, ctx, update), fields(actor = %ctx.user_id))]
    pub async fn update_event(
        &self,
        ctx: &AuthContext,
        id: EventId,
        update: EventUpdate,
    ) -> Result<Event, SocialError> {
        let action = EventAction::Update {
            event_id: id,
            actor: ctx.user_id,
            update,
        };
        self.execute(action, id).await
    }

    /// Delete an event; owner or administrator
    ///
    /// # Errors
    ///
    /// [`SocialError::Forbidden`] for anyone else;
    /// [`SocialError::NotFound`] for an unknown event.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.user_id))]
    pub async fn delete_event(&self, ctx: &AuthContext, id: EventId) -> Result<Event, SocialError> {
        let action = EventAction::Delete {
            event_id: id,
            actor: ctx.user_id,
            actor_is_admin: ctx.is_admin,
        };
        let ((rejection, removed), _effects) = self
            .store
            .send_and_inspect(action, |state| {
                (state.last_rejection.clone(), state.last_deleted.clone())
            })
            .await?;
        match (rejection, removed) {
            (Some(rejection), _) => Err(rejection.into()),
            (None, Some(event)) => Ok(event),
            (None, None) => Err(SocialError::not_found("event", id)),
        }
    }

    /// Look up an event
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the event does not exist.
    pub async fn get_event(&self, id: EventId) -> Result<Event, SocialError> {
        self.store
            .state(|state| state.get(&id).cloned())
            .await
            .ok_or_else(|| SocialError::not_found("event", id))
    }

    /// Every event, newest date first
    pub async fn list_events(&self, page: Page) -> Paged<Event> {
        self.store.state(|state| state.list(page)).await
    }

    /// Events that have not happened yet, newest date first
    pub async fn upcoming_events(&self, page: Page) -> Paged<Event> {
        let now = self.clock.now();
        self.store.state(|state| state.upcoming(now, page)).await
    }

    /// Events created by `user`, newest date first
    pub async fn events_by_user(&self, user: UserId, page: Page) -> Paged<Event> {
        self.store.state(|state| state.by_owner(&user, page)).await
    }
}
