//! RSVP manager.

use super::{EventAction, EventStore, RsvpOutcome};
use crate::auth::AuthContext;
use crate::error::SocialError;
use crate::types::{EventId, RsvpChoice, RsvpLists, UserId};

/// Typed facade over the event store for responses
///
/// A refused second response is an [`RsvpOutcome::AlreadyResponded`], not an
/// error, so retrying a `respond` never records anything twice.
#[derive(Clone)]
pub struct RsvpManager {
    store: EventStore,
}

impl RsvpManager {
    /// Wraps an event store
    #[must_use]
    pub const fn new(store: EventStore) -> Self {
        Self { store }
    }

    /// Record the caller's response to `event`
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the event does not exist.
    #[tracing::instrument(skip(self, ctx), fields(user = %ctx.user_id))]
    pub async fn respond(
        &self,
        ctx: &AuthContext,
        event: EventId,
        choice: RsvpChoice,
    ) -> Result<RsvpOutcome, SocialError> {
        let action = EventAction::Respond {
            event_id: event,
            user_id: ctx.user_id,
            choice,
        };
        let ((rejection, outcome), _effects) = self
            .store
            .send_and_inspect(action, |state| (state.last_rejection.clone(), state.last_rsvp))
            .await?;
        match (rejection, outcome) {
            (Some(rejection), _) => Err(rejection.into()),
            (None, Some(outcome)) => Ok(outcome),
            (None, None) => Err(SocialError::not_found("event", event)),
        }
    }

    /// Where `user` stands on `event`
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the event does not exist.
    pub async fn response_of(
        &self,
        event: EventId,
        user: UserId,
    ) -> Result<Option<RsvpChoice>, SocialError> {
        self.store
            .state(|state| state.response_of(&event, &user))
            .await
            .ok_or_else(|| SocialError::not_found("event", event))
    }

    /// The three response lists of `event`
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the event does not exist.
    pub async fn responses(&self, event: EventId) -> Result<RsvpLists, SocialError> {
        self.store
            .state(|state| state.get(&event).map(|event| event.rsvp.clone()))
            .await
            .ok_or_else(|| SocialError::not_found("event", event))
    }
}
