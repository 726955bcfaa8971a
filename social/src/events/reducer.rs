//! Event reducer: the event catalogue and the RSVP state machine.
//!
//! Per (event, user) pair a response is either absent or recorded in exactly
//! one of the three lists. The store runs one reducer step at a time, so the
//! "is the user already listed?" check and the append can never interleave
//! with another response for the same pair.

use crate::config::RsvpConfig;
use crate::environment::SocialEnvironment;
use crate::error::SocialError;
use crate::notifications::{self, Audience, Channel, Notification};
use crate::types::{Event, EventId, EventUpdate, NewEvent, Page, Paged, RsvpChoice, RsvpLists, UserId};
use chrono::{DateTime, Utc};
use gatherly_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use gatherly_macros::Action;
use std::collections::HashMap;
use thiserror::Error;

/// Longest accepted event name, in characters
pub const MAX_EVENT_NAME_LEN: usize = 200;

// ============================================================================
// State
// ============================================================================

/// Result of one `respond` call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RsvpOutcome {
    /// The user had not answered; the choice was recorded
    Responded(RsvpChoice),
    /// The user moved from one list to another (only when changes are allowed)
    Changed {
        /// Previous choice
        from: RsvpChoice,
        /// New choice
        to: RsvpChoice,
    },
    /// The user had already answered; nothing changed
    AlreadyResponded(RsvpChoice),
}

/// Every event, keyed by id
#[derive(Clone, Debug, Default)]
pub struct EventState {
    /// All events indexed by ID
    pub events: HashMap<EventId, Event>,
    /// Why the last command was refused, if it was
    pub last_rejection: Option<EventRejection>,
    /// Outcome of the last `Respond` command
    pub last_rsvp: Option<RsvpOutcome>,
    /// The event removed by the most recent deletion
    pub last_deleted: Option<Event>,
}

impl EventState {
    /// Creates an empty `EventState`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets an event by ID
    #[must_use]
    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.events.get(id)
    }

    /// Returns the number of events
    #[must_use]
    pub fn count(&self) -> usize {
        self.events.len()
    }

    /// Where `user` stands on `event`; `None` for an unknown event
    #[must_use]
    pub fn response_of(&self, event: &EventId, user: &UserId) -> Option<Option<RsvpChoice>> {
        self.get(event).map(|event| event.rsvp.response_of(user))
    }

    /// All events, newest date first
    #[must_use]
    pub fn list(&self, page: Page) -> Paged<Event> {
        self.select(page, |_| true)
    }

    /// Events dated strictly after `now`, newest date first
    #[must_use]
    pub fn upcoming(&self, now: DateTime<Utc>, page: Page) -> Paged<Event> {
        self.select(page, |event| event.date > now)
    }

    /// Events created by `owner`, newest date first
    #[must_use]
    pub fn by_owner(&self, owner: &UserId, page: Page) -> Paged<Event> {
        self.select(page, |event| event.created_by == *owner)
    }

    fn select(&self, page: Page, keep: impl Fn(&Event) -> bool) -> Paged<Event> {
        let mut matching: Vec<Event> = self
            .events
            .values()
            .filter(|event| keep(event))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Paged::from_sorted(matching, page)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Why an event command was refused
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum EventRejection {
    /// The id does not resolve to an event
    #[error("event {0} not found")]
    UnknownEvent(EventId),
    /// The id is already used by another event
    #[error("event {0} already exists")]
    DuplicateEvent(EventId),
    /// Only the owner may do this
    #[error("only the owner can {0}")]
    NotOwner(&'static str),
    /// Only the owner or an administrator may do this
    #[error("only the owner or an administrator can {0}")]
    NotOwnerOrAdmin(&'static str),
    /// Malformed input
    #[error("{0}")]
    Invalid(String),
}

impl From<EventRejection> for SocialError {
    fn from(rejection: EventRejection) -> Self {
        match rejection {
            EventRejection::UnknownEvent(id) => Self::not_found("event", id),
            EventRejection::NotOwner(action) | EventRejection::NotOwnerOrAdmin(action) => {
                Self::Forbidden { action }
            },
            EventRejection::Invalid(reason) => Self::InvalidInput(reason),
            duplicate @ EventRejection::DuplicateEvent(_) => {
                Self::InvalidInput(duplicate.to_string())
            },
        }
    }
}

/// Commands, accepted changes and rejections for the event store
#[derive(Action, Clone, Debug, PartialEq)]
pub enum EventAction {
    // Commands
    /// Create an event
    #[command]
    Create {
        /// Identifier for the new event
        id: EventId,
        /// Owning user
        owner: UserId,
        /// Name, description, location and date
        details: NewEvent,
    },

    /// Edit an event
    #[command]
    Update {
        /// Event to edit
        event_id: EventId,
        /// Who is editing
        actor: UserId,
        /// Fields to change
        update: EventUpdate,
    },

    /// Delete an event
    #[command]
    Delete {
        /// Event to delete
        event_id: EventId,
        /// Who is deleting
        actor: UserId,
        /// Privilege flag from the caller's auth context
        actor_is_admin: bool,
    },

    /// Record a user's response
    #[command]
    Respond {
        /// Event responded to
        event_id: EventId,
        /// Responding user
        user_id: UserId,
        /// Yes, no or maybe
        choice: RsvpChoice,
    },

    // Events
    /// An event was created
    #[event]
    Created {
        /// The new event
        event: Event,
    },

    /// An event was edited
    #[event]
    Updated {
        /// Edited event
        event_id: EventId,
        /// Applied changes, already normalised
        update: EventUpdate,
        /// When
        updated_at: DateTime<Utc>,
    },

    /// An event was deleted
    #[event]
    Deleted {
        /// Deleted event
        event_id: EventId,
    },

    /// A first response was recorded
    #[event]
    Responded {
        /// Event
        event_id: EventId,
        /// User
        user_id: UserId,
        /// Recorded choice
        choice: RsvpChoice,
    },

    /// A response moved to another list
    #[event]
    ResponseChanged {
        /// Event
        event_id: EventId,
        /// User
        user_id: UserId,
        /// Previous choice
        from: RsvpChoice,
        /// New choice
        to: RsvpChoice,
    },

    // Rejections
    /// A command was refused
    #[rejection]
    Rejected {
        /// Why
        rejection: EventRejection,
    },

    /// A response was refused because one is already recorded
    #[rejection]
    ResponseRejected {
        /// Event
        event_id: EventId,
        /// User
        user_id: UserId,
        /// The response that stays in place
        existing: RsvpChoice,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Whether a recorded response may be replaced
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RsvpPolicy {
    /// Let a user switch to a different choice
    pub allow_response_change: bool,
}

impl From<RsvpConfig> for RsvpPolicy {
    fn from(config: RsvpConfig) -> Self {
        Self {
            allow_response_change: config.allow_response_change,
        }
    }
}

/// Reducer for the event store
#[derive(Clone, Debug, Default)]
pub struct EventReducer {
    policy: RsvpPolicy,
}

impl EventReducer {
    /// Creates a reducer where a response, once recorded, is final
    #[must_use]
    pub const fn new() -> Self {
        Self {
            policy: RsvpPolicy {
                allow_response_change: false,
            },
        }
    }

    /// Creates a reducer with an explicit RSVP policy
    #[must_use]
    pub const fn with_policy(policy: RsvpPolicy) -> Self {
        Self { policy }
    }

    fn validate_name(name: &str) -> Result<String, EventRejection> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EventRejection::Invalid("event name is required".to_string()));
        }
        if name.chars().count() > MAX_EVENT_NAME_LEN {
            return Err(EventRejection::Invalid(format!(
                "event name exceeds {MAX_EVENT_NAME_LEN} characters"
            )));
        }
        Ok(name.to_string())
    }

    fn validate_create(
        state: &EventState,
        id: EventId,
        details: NewEvent,
    ) -> Result<NewEvent, EventRejection> {
        if state.get(&id).is_some() {
            return Err(EventRejection::DuplicateEvent(id));
        }
        Ok(NewEvent {
            name: Self::validate_name(&details.name)?,
            ..details
        })
    }

    fn validate_update(
        state: &EventState,
        event_id: EventId,
        actor: UserId,
        update: EventUpdate,
    ) -> Result<EventUpdate, EventRejection> {
        let event = state
            .get(&event_id)
            .ok_or(EventRejection::UnknownEvent(event_id))?;
        if event.created_by != actor {
            return Err(EventRejection::NotOwner("update the event"));
        }
        if update.is_empty() {
            return Err(EventRejection::Invalid("nothing to update".to_string()));
        }
        let name = update.name.as_deref().map(Self::validate_name).transpose()?;
        Ok(EventUpdate { name, ..update })
    }

    fn validate_delete(
        state: &EventState,
        event_id: EventId,
        actor: UserId,
        actor_is_admin: bool,
    ) -> Result<String, EventRejection> {
        let event = state
            .get(&event_id)
            .ok_or(EventRejection::UnknownEvent(event_id))?;
        if event.created_by != actor && !actor_is_admin {
            return Err(EventRejection::NotOwnerOrAdmin("delete the event"));
        }
        Ok(event.name.clone())
    }

    /// Applies an accepted change or a rejection to state
    fn apply_event(state: &mut EventState, action: &EventAction) {
        if action.is_command() {
            return;
        }
        state.last_rejection = None;
        state.last_rsvp = None;

        match action {
            EventAction::Created { event } => {
                state.events.insert(event.id, event.clone());
            },
            EventAction::Updated {
                event_id,
                update,
                updated_at,
            } => {
                if let Some(event) = state.events.get_mut(event_id) {
                    let update = update.clone();
                    if let Some(name) = update.name {
                        event.name = name;
                    }
                    if update.description.is_some() {
                        event.description = update.description;
                    }
                    if update.location.is_some() {
                        event.location = update.location;
                    }
                    if let Some(date) = update.date {
                        event.date = date;
                    }
                    event.updated_at = *updated_at;
                }
            },
            EventAction::Deleted { event_id } => {
                state.last_deleted = state.events.remove(event_id);
            },
            EventAction::Responded {
                event_id,
                user_id,
                choice,
            } => {
                if let Some(event) = state.events.get_mut(event_id) {
                    event.rsvp.record(*user_id, *choice);
                }
                state.last_rsvp = Some(RsvpOutcome::Responded(*choice));
            },
            EventAction::ResponseChanged {
                event_id,
                user_id,
                from,
                to,
            } => {
                if let Some(event) = state.events.get_mut(event_id) {
                    event.rsvp.withdraw(user_id);
                    event.rsvp.record(*user_id, *to);
                }
                state.last_rsvp = Some(RsvpOutcome::Changed { from: *from, to: *to });
            },
            EventAction::ResponseRejected { existing, .. } => {
                state.last_rsvp = Some(RsvpOutcome::AlreadyResponded(*existing));
            },
            EventAction::Rejected { rejection } => {
                state.last_rejection = Some(rejection.clone());
            },
            EventAction::Create { .. }
            | EventAction::Update { .. }
            | EventAction::Delete { .. }
            | EventAction::Respond { .. } => {},
        }
    }

    fn reject(state: &mut EventState, rejection: EventRejection) -> SmallVec<[Effect; 4]> {
        tracing::debug!(%rejection, "Event command rejected");
        Self::apply_event(state, &EventAction::Rejected { rejection });
        SmallVec::new()
    }

    fn accept(state: &mut EventState, event: &EventAction) {
        tracing::debug!(event_type = event.event_type(), "Event change accepted");
        Self::apply_event(state, event);
    }

    fn respond(
        &self,
        state: &mut EventState,
        event_id: EventId,
        user_id: UserId,
        choice: RsvpChoice,
        env: &SocialEnvironment,
    ) -> SmallVec<[Effect; 4]> {
        let Some(existing) = state.response_of(&event_id, &user_id) else {
            return Self::reject(state, EventRejection::UnknownEvent(event_id));
        };

        let (change, channel, notification) = match existing {
            None => (
                EventAction::Responded {
                    event_id,
                    user_id,
                    choice,
                },
                Channel::RsvpDone,
                Notification::rsvp_done(),
            ),
            Some(from) if from != choice && self.policy.allow_response_change => (
                EventAction::ResponseChanged {
                    event_id,
                    user_id,
                    from,
                    to: choice,
                },
                Channel::RsvpDone,
                Notification::rsvp_done(),
            ),
            Some(existing) => (
                EventAction::ResponseRejected {
                    event_id,
                    user_id,
                    existing,
                },
                Channel::AlreadyRsvp,
                Notification::already_rsvp(),
            ),
        };

        if change.is_rejection() {
            tracing::debug!(%event_id, %user_id, "Response already recorded");
            Self::apply_event(state, &change);
        } else {
            Self::accept(state, &change);
        }
        smallvec![notifications::publish(
            env,
            Audience::User(user_id),
            channel,
            notification,
        )]
    }
}

impl Reducer for EventReducer {
    type State = EventState;
    type Action = EventAction;
    type Environment = SocialEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        match action {
            EventAction::Create { id, owner, details } => {
                match Self::validate_create(state, id, details) {
                    Ok(details) => {
                        let now = env.clock.now();
                        let event = Event {
                            id,
                            name: details.name,
                            description: details.description,
                            location: details.location,
                            date: details.date,
                            created_by: owner,
                            rsvp: RsvpLists::new(),
                            created_at: now,
                            updated_at: now,
                        };
                        let notification = Notification::new_event(&event.name);
                        tracing::info!(event_id = %id, %owner, "Event created");
                        Self::accept(state, &EventAction::Created { event });
                        smallvec![notifications::publish(
                            env,
                            Audience::Everyone,
                            Channel::NewEvent,
                            notification,
                        )]
                    },
                    Err(rejection) => Self::reject(state, rejection),
                }
            },

            EventAction::Update {
                event_id,
                actor,
                update,
            } => match Self::validate_update(state, event_id, actor, update) {
                Ok(update) => {
                    Self::accept(
                        state,
                        &EventAction::Updated {
                            event_id,
                            update,
                            updated_at: env.clock.now(),
                        },
                    );
                    let name = state
                        .get(&event_id)
                        .map(|event| event.name.clone())
                        .unwrap_or_default();
                    smallvec![notifications::publish(
                        env,
                        Audience::Everyone,
                        Channel::EventUpdate,
                        Notification::event_updated(&name),
                    )]
                },
                Err(rejection) => Self::reject(state, rejection),
            },

            EventAction::Delete {
                event_id,
                actor,
                actor_is_admin,
            } => match Self::validate_delete(state, event_id, actor, actor_is_admin) {
                Ok(name) => {
                    tracing::info!(%event_id, %actor, "Event deleted");
                    Self::accept(state, &EventAction::Deleted { event_id });
                    smallvec![notifications::publish(
                        env,
                        Audience::Everyone,
                        Channel::EventDeleted,
                        Notification::event_deleted(&name),
                    )]
                },
                Err(rejection) => Self::reject(state, rejection),
            },

            EventAction::Respond {
                event_id,
                user_id,
                choice,
            } => self.respond(state, event_id, user_id, choice, env),

            // Events and rejections arriving directly are applied as-is
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gatherly_testing::{assertions, test_clock, test_epoch, RecordingEventBus, ReducerTest};
    use std::sync::Arc;

    fn env() -> SocialEnvironment {
        SocialEnvironment::new(Arc::new(test_clock()), Arc::new(RecordingEventBus::new()))
    }

    fn create(id: EventId, owner: UserId, name: &str, days_from_epoch: i64) -> EventAction {
        EventAction::Create {
            id,
            owner,
            details: NewEvent {
                name: name.to_string(),
                description: None,
                location: Some("Park".to_string()),
                date: test_epoch() + Duration::days(days_from_epoch),
            },
        }
    }

    fn respond(event_id: EventId, user_id: UserId, choice: RsvpChoice) -> EventAction {
        EventAction::Respond {
            event_id,
            user_id,
            choice,
        }
    }

    #[test]
    fn create_trims_name_and_announces() {
        let (id, owner) = (EventId::new(), UserId::new());
        ReducerTest::new(EventReducer::new())
            .with_env(env())
            .given_state(EventState::new())
            .when_action(create(id, owner, "  Picnic  ", 3))
            .then_state(move |state| {
                let event = state.get(&id).unwrap();
                assert_eq!(event.name, "Picnic");
                assert_eq!(event.created_by, owner);
                assert_eq!(event.rsvp.total(), 0);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn create_rejects_overlong_name() {
        let long = "x".repeat(MAX_EVENT_NAME_LEN + 1);
        ReducerTest::new(EventReducer::new())
            .with_env(env())
            .given_state(EventState::new())
            .when_action(create(EventId::new(), UserId::new(), &long, 1))
            .then_state(|state| {
                assert_eq!(state.count(), 0);
                assert!(matches!(state.last_rejection, Some(EventRejection::Invalid(_))));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn update_is_owner_only() {
        let (id, owner, other) = (EventId::new(), UserId::new(), UserId::new());
        ReducerTest::new(EventReducer::new())
            .with_env(env())
            .given_state(EventState::new())
            .given_actions(vec![create(id, owner, "Picnic", 3)])
            .when_action(EventAction::Update {
                event_id: id,
                actor: other,
                update: EventUpdate {
                    name: Some("Party".into()),
                    ..EventUpdate::default()
                },
            })
            .then_state(move |state| {
                assert_eq!(state.get(&id).unwrap().name, "Picnic");
                assert_eq!(
                    state.last_rejection,
                    Some(EventRejection::NotOwner("update the event"))
                );
            })
            .run();
    }

    #[test]
    fn admin_may_delete_someone_elses_event() {
        let (id, owner, admin) = (EventId::new(), UserId::new(), UserId::new());
        ReducerTest::new(EventReducer::new())
            .with_env(env())
            .given_state(EventState::new())
            .given_actions(vec![create(id, owner, "Picnic", 3)])
            .when_action(EventAction::Delete {
                event_id: id,
                actor: admin,
                actor_is_admin: true,
            })
            .then_state(move |state| {
                assert!(state.get(&id).is_none());
                assert_eq!(state.last_deleted.as_ref().unwrap().id, id);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn first_response_is_recorded() {
        let (id, user) = (EventId::new(), UserId::new());
        ReducerTest::new(EventReducer::new())
            .with_env(env())
            .given_state(EventState::new())
            .given_actions(vec![create(id, UserId::new(), "Picnic", 3)])
            .when_action(respond(id, user, RsvpChoice::Maybe))
            .then_state(move |state| {
                assert_eq!(state.get(&id).unwrap().rsvp.list(RsvpChoice::Maybe), &[user]);
                assert_eq!(state.last_rsvp, Some(RsvpOutcome::Responded(RsvpChoice::Maybe)));
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn second_response_is_refused_and_lists_stay_put() {
        let (id, user) = (EventId::new(), UserId::new());
        ReducerTest::new(EventReducer::new())
            .with_env(env())
            .given_state(EventState::new())
            .given_actions(vec![
                create(id, UserId::new(), "Picnic", 3),
                respond(id, user, RsvpChoice::Yes),
            ])
            .when_action(respond(id, user, RsvpChoice::No))
            .then_state(move |state| {
                let rsvp = &state.get(&id).unwrap().rsvp;
                assert_eq!(rsvp.list(RsvpChoice::Yes), &[user]);
                assert!(rsvp.list(RsvpChoice::No).is_empty());
                assert_eq!(
                    state.last_rsvp,
                    Some(RsvpOutcome::AlreadyResponded(RsvpChoice::Yes))
                );
                assert_eq!(state.last_rejection, None);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn change_policy_moves_user_between_lists() {
        let (id, user) = (EventId::new(), UserId::new());
        let policy = RsvpPolicy {
            allow_response_change: true,
        };
        ReducerTest::new(EventReducer::with_policy(policy))
            .with_env(env())
            .given_state(EventState::new())
            .given_actions(vec![
                create(id, UserId::new(), "Picnic", 3),
                respond(id, user, RsvpChoice::Yes),
            ])
            .when_action(respond(id, user, RsvpChoice::No))
            .then_state(move |state| {
                let rsvp = &state.get(&id).unwrap().rsvp;
                assert!(rsvp.list(RsvpChoice::Yes).is_empty());
                assert_eq!(rsvp.list(RsvpChoice::No), &[user]);
                assert!(rsvp.violations().is_empty());
                assert_eq!(
                    state.last_rsvp,
                    Some(RsvpOutcome::Changed {
                        from: RsvpChoice::Yes,
                        to: RsvpChoice::No
                    })
                );
            })
            .run();
    }

    #[test]
    fn change_policy_still_refuses_the_same_choice() {
        let (id, user) = (EventId::new(), UserId::new());
        let policy = RsvpPolicy {
            allow_response_change: true,
        };
        ReducerTest::new(EventReducer::with_policy(policy))
            .with_env(env())
            .given_state(EventState::new())
            .given_actions(vec![
                create(id, UserId::new(), "Picnic", 3),
                respond(id, user, RsvpChoice::Yes),
            ])
            .when_action(respond(id, user, RsvpChoice::Yes))
            .then_state(move |state| {
                assert_eq!(state.get(&id).unwrap().rsvp.total(), 1);
                assert_eq!(
                    state.last_rsvp,
                    Some(RsvpOutcome::AlreadyResponded(RsvpChoice::Yes))
                );
            })
            .run();
    }

    #[test]
    fn response_to_unknown_event_is_rejected() {
        let id = EventId::new();
        ReducerTest::new(EventReducer::new())
            .with_env(env())
            .given_state(EventState::new())
            .when_action(respond(id, UserId::new(), RsvpChoice::Yes))
            .then_state(move |state| {
                assert_eq!(state.last_rejection, Some(EventRejection::UnknownEvent(id)));
                assert_eq!(state.last_rsvp, None);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn listings_sort_newest_date_first() {
        let owner = UserId::new();
        let (past, soon, later) = (EventId::new(), EventId::new(), EventId::new());
        let mut state = EventState::new();
        let reducer = EventReducer::new();
        let env = env();
        for action in [
            create(past, owner, "Past", -2),
            create(soon, UserId::new(), "Soon", 1),
            create(later, owner, "Later", 5),
        ] {
            let _ = reducer.reduce(&mut state, action, &env);
        }

        let all: Vec<_> = state.list(Page::default()).items.into_iter().map(|e| e.id).collect();
        assert_eq!(all, vec![later, soon, past]);

        let upcoming = state.upcoming(test_epoch(), Page::default());
        assert_eq!(upcoming.total, 2);

        let mine: Vec<_> = state
            .by_owner(&owner, Page::new(1, 1))
            .items
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(mine, vec![later]);
    }

    #[test]
    fn rejection_kinds_are_classified() {
        let action = EventAction::ResponseRejected {
            event_id: EventId::new(),
            user_id: UserId::new(),
            existing: RsvpChoice::Yes,
        };
        assert!(action.is_rejection());
        assert_eq!(
            EventAction::Deleted { event_id: EventId::new() }.event_type(),
            "Deleted.v1"
        );
    }
}
