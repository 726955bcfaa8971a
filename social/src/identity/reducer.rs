//! User reducer: accounts and the follow / block relationship lists.
//!
//! Both endpoints of a follow edge live in the same [`UserState`], and one
//! reducer step runs under the store's write lock, so an edge is always
//! recorded (or removed) on both sides at once.

use crate::environment::SocialEnvironment;
use crate::error::SocialError;
use crate::notifications::{self, Audience, Channel, Notification};
use crate::types::{PersonName, ProfileUpdate, User, UserId, UserProfile, UserSummary};
use chrono::{DateTime, Utc};
use gatherly_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use gatherly_macros::Action;
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// State
// ============================================================================

/// Every registered user, keyed by id
#[derive(Clone, Debug, Default)]
pub struct UserState {
    /// All users indexed by ID
    pub users: HashMap<UserId, User>,
    /// Outcome of the last command if it was refused
    pub last_rejection: Option<UserRejection>,
    /// The user removed by the most recent deletion
    pub last_deleted: Option<User>,
}

impl UserState {
    /// Creates an empty `UserState`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a user by ID
    #[must_use]
    pub fn get(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    /// Checks if a user exists
    #[must_use]
    pub fn exists(&self, id: &UserId) -> bool {
        self.users.contains_key(id)
    }

    /// Returns the number of users
    #[must_use]
    pub fn count(&self) -> usize {
        self.users.len()
    }

    /// Summary of one user, if it still exists
    #[must_use]
    pub fn summary(&self, id: &UserId) -> Option<UserSummary> {
        self.get(id).map(User::summary)
    }

    /// A user with followings, followers and blocked resolved to summaries
    #[must_use]
    pub fn profile(&self, id: &UserId) -> Option<UserProfile> {
        let user = self.get(id)?;
        Some(UserProfile {
            followings: self.resolve(&user.followings),
            followers: self.resolve(&user.followers),
            blocked: self.resolve(&user.blocked),
            user: user.clone(),
        })
    }

    fn resolve(&self, ids: &[UserId]) -> Vec<UserSummary> {
        ids.iter().filter_map(|id| self.summary(id)).collect()
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|user| Some(user.id) != except && user.email == email)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Why a user command was refused
///
/// Several of these are ordinary outcomes rather than failures; the managers
/// turn them into outcome enums or [`SocialError`]s.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum UserRejection {
    /// The id does not resolve to a user
    #[error("user {0} not found")]
    UnknownUser(UserId),
    /// The id is already registered
    #[error("user {0} already exists")]
    DuplicateUser(UserId),
    /// A user tried to follow themselves
    #[error("users cannot follow themselves")]
    SelfFollow,
    /// The follow edge already exists
    #[error("already following")]
    AlreadyFollowing,
    /// There is no follow edge to remove
    #[error("not following")]
    NotFollowing,
    /// The user to drop is not a follower
    #[error("not a follower")]
    NotAFollower,
    /// The action needs administrative privilege
    #[error("{0} requires administrative privilege")]
    NotAdmin(&'static str),
    /// The target is already blocked
    #[error("already blocked")]
    AlreadyBlocked,
    /// The target is not blocked
    #[error("not blocked")]
    NotBlocked,
    /// Malformed input
    #[error("{0}")]
    Invalid(String),
}

impl From<UserRejection> for SocialError {
    fn from(rejection: UserRejection) -> Self {
        match rejection {
            UserRejection::UnknownUser(id) => Self::not_found("user", id),
            UserRejection::NotAdmin(action) => Self::Forbidden { action },
            UserRejection::Invalid(reason) => Self::InvalidInput(reason),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

/// Commands, accepted changes and rejections for the user store
#[derive(Action, Clone, Debug, PartialEq)]
pub enum UserAction {
    // Commands
    /// Register a new account
    #[command]
    Register {
        /// Identifier for the new user
        id: UserId,
        /// Display name
        name: PersonName,
        /// Contact email
        email: String,
        /// Administrative privilege
        is_admin: bool,
    },

    /// Change profile fields
    #[command]
    UpdateProfile {
        /// User being edited
        user_id: UserId,
        /// Fields to change
        update: ProfileUpdate,
    },

    /// Activate an account
    #[command]
    Activate {
        /// Account to activate
        user_id: UserId,
    },

    /// Delete an account
    #[command]
    DeleteAccount {
        /// Account to delete
        user_id: UserId,
    },

    /// Start following someone
    #[command]
    Follow {
        /// Follower
        actor: UserId,
        /// User to follow
        target: UserId,
    },

    /// Stop following someone
    #[command]
    Unfollow {
        /// Follower
        actor: UserId,
        /// User to stop following
        target: UserId,
    },

    /// Take yourself off someone's follower list
    #[command]
    RemoveFollower {
        /// Follower leaving the list
        actor: UserId,
        /// User whose follower list shrinks
        target: UserId,
    },

    /// Drop one of your own followers
    #[command]
    DropFollower {
        /// User whose follower list shrinks
        actor: UserId,
        /// Follower to drop
        follower: UserId,
    },

    /// Block a user
    #[command]
    Block {
        /// Administrator doing the blocking
        actor: UserId,
        /// Privilege flag from the caller's auth context
        actor_is_admin: bool,
        /// User to block
        target: UserId,
    },

    /// Unblock a user
    #[command]
    Unblock {
        /// Administrator doing the unblocking
        actor: UserId,
        /// Privilege flag from the caller's auth context
        actor_is_admin: bool,
        /// User to unblock
        target: UserId,
    },

    // Events
    /// An account was registered
    #[event]
    Registered {
        /// New user
        id: UserId,
        /// Display name, trimmed
        name: PersonName,
        /// Email, lowercased
        email: String,
        /// Administrative privilege
        is_admin: bool,
        /// When
        registered_at: DateTime<Utc>,
    },

    /// Profile fields changed
    #[event]
    ProfileUpdated {
        /// Edited user
        user_id: UserId,
        /// Applied changes
        update: ProfileUpdate,
        /// When
        updated_at: DateTime<Utc>,
    },

    /// An account was activated
    #[event]
    Activated {
        /// Activated user
        user_id: UserId,
        /// When
        activated_at: DateTime<Utc>,
    },

    /// An account was deleted
    #[event]
    AccountDeleted {
        /// Deleted user
        user_id: UserId,
    },

    /// A follow edge was added on both sides
    #[event]
    Followed {
        /// Follower
        actor: UserId,
        /// Followed user
        target: UserId,
        /// When
        at: DateTime<Utc>,
    },

    /// A follow edge was removed on both sides
    #[event]
    Unfollowed {
        /// Former follower
        actor: UserId,
        /// Formerly followed user
        target: UserId,
        /// When
        at: DateTime<Utc>,
    },

    /// The actor left the target's follower list, on both sides
    #[event]
    FollowerRemoved {
        /// Former follower
        actor: UserId,
        /// User whose follower list shrank
        target: UserId,
        /// When
        at: DateTime<Utc>,
    },

    /// A follower was dropped on both sides
    #[event]
    FollowerDropped {
        /// User who dropped the follower
        actor: UserId,
        /// Dropped follower
        follower: UserId,
        /// When
        at: DateTime<Utc>,
    },

    /// A user was blocked
    #[event]
    UserBlocked {
        /// Administrator
        actor: UserId,
        /// Blocked user
        target: UserId,
        /// When
        at: DateTime<Utc>,
    },

    /// A user was unblocked
    #[event]
    UserUnblocked {
        /// Administrator
        actor: UserId,
        /// Unblocked user
        target: UserId,
        /// When
        at: DateTime<Utc>,
    },

    /// A command was refused
    #[rejection]
    Rejected {
        /// Why
        rejection: UserRejection,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the user store
#[derive(Clone, Debug, Default)]
pub struct UserReducer;

impl UserReducer {
    /// Creates a new `UserReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn require(state: &UserState, id: UserId) -> Result<&User, UserRejection> {
        state.get(&id).ok_or(UserRejection::UnknownUser(id))
    }

    fn validate_name(name: &PersonName) -> Result<PersonName, UserRejection> {
        let first = name.first.trim();
        let last = name.last.trim();
        if first.is_empty() || last.is_empty() {
            return Err(UserRejection::Invalid(
                "first and last name are required".to_string(),
            ));
        }
        Ok(PersonName::new(first, last))
    }

    fn validate_email(
        state: &UserState,
        email: &str,
        except: Option<UserId>,
    ) -> Result<String, UserRejection> {
        let email = email.trim().to_lowercase();
        let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        });
        if !well_formed {
            return Err(UserRejection::Invalid(format!("invalid email: {email}")));
        }
        if state.email_taken(&email, except) {
            return Err(UserRejection::Invalid(format!(
                "email already registered: {email}"
            )));
        }
        Ok(email)
    }

    fn validate_register(
        state: &UserState,
        id: UserId,
        name: &PersonName,
        email: &str,
    ) -> Result<(PersonName, String), UserRejection> {
        if state.exists(&id) {
            return Err(UserRejection::DuplicateUser(id));
        }
        let name = Self::validate_name(name)?;
        let email = Self::validate_email(state, email, None)?;
        Ok((name, email))
    }

    fn validate_update(
        state: &UserState,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<ProfileUpdate, UserRejection> {
        Self::require(state, user_id)?;
        if update.is_empty() {
            return Err(UserRejection::Invalid("nothing to update".to_string()));
        }
        let name = update.name.as_ref().map(Self::validate_name).transpose()?;
        let email = update
            .email
            .as_deref()
            .map(|email| Self::validate_email(state, email, Some(user_id)))
            .transpose()?;
        Ok(ProfileUpdate {
            name,
            email,
            ..update
        })
    }

    fn validate_follow(state: &UserState, actor: UserId, target: UserId) -> Result<(), UserRejection> {
        if actor == target {
            return Err(UserRejection::SelfFollow);
        }
        let actor = Self::require(state, actor)?;
        Self::require(state, target)?;
        if actor.follows(&target) {
            return Err(UserRejection::AlreadyFollowing);
        }
        Ok(())
    }

    /// A target that no longer exists can still be unfollowed, which cleans
    /// up the dangling id.
    fn validate_unfollow(state: &UserState, actor: UserId, target: UserId) -> Result<(), UserRejection> {
        let actor = Self::require(state, actor)?;
        if actor.follows(&target) {
            return Ok(());
        }
        if !state.exists(&target) {
            return Err(UserRejection::UnknownUser(target));
        }
        Err(UserRejection::NotFollowing)
    }

    /// Checked against the target's follower list, so an actor whose account
    /// is gone can still be cleared out of it.
    fn validate_remove_follower(
        state: &UserState,
        actor: UserId,
        target: UserId,
    ) -> Result<(), UserRejection> {
        let target = Self::require(state, target)?;
        if target.is_followed_by(&actor) {
            return Ok(());
        }
        Err(UserRejection::NotFollowing)
    }

    fn validate_drop_follower(
        state: &UserState,
        actor: UserId,
        follower: UserId,
    ) -> Result<(), UserRejection> {
        let actor = Self::require(state, actor)?;
        if actor.is_followed_by(&follower) {
            return Ok(());
        }
        if !state.exists(&follower) {
            return Err(UserRejection::UnknownUser(follower));
        }
        Err(UserRejection::NotAFollower)
    }

    fn validate_block(
        state: &UserState,
        actor: UserId,
        actor_is_admin: bool,
        target: UserId,
    ) -> Result<(), UserRejection> {
        if !actor_is_admin {
            return Err(UserRejection::NotAdmin("block user"));
        }
        let admin = Self::require(state, actor)?;
        Self::require(state, target)?;
        if admin.has_blocked(&target) {
            return Err(UserRejection::AlreadyBlocked);
        }
        Ok(())
    }

    fn validate_unblock(
        state: &UserState,
        actor: UserId,
        actor_is_admin: bool,
        target: UserId,
    ) -> Result<(), UserRejection> {
        if !actor_is_admin {
            return Err(UserRejection::NotAdmin("unblock user"));
        }
        let admin = Self::require(state, actor)?;
        if !admin.has_blocked(&target) {
            return Err(UserRejection::NotBlocked);
        }
        Ok(())
    }

    fn remove_first(list: &mut Vec<UserId>, id: &UserId) {
        if let Some(position) = list.iter().position(|candidate| candidate == id) {
            list.remove(position);
        }
    }

    /// Applies an accepted change or a rejection to state
    fn apply_event(state: &mut UserState, action: &UserAction) {
        match action {
            UserAction::Registered {
                id,
                name,
                email,
                is_admin,
                registered_at,
            } => {
                let user = User::new(*id, name.clone(), email.clone(), *is_admin, *registered_at);
                state.users.insert(*id, user);
            },
            UserAction::ProfileUpdated {
                user_id,
                update,
                updated_at,
            } => {
                if let Some(user) = state.users.get_mut(user_id) {
                    let update = update.clone();
                    if let Some(name) = update.name {
                        user.name = name;
                    }
                    if let Some(email) = update.email {
                        user.email = email;
                    }
                    if update.company.is_some() {
                        user.company = update.company;
                    }
                    if update.website.is_some() {
                        user.website = update.website;
                    }
                    if update.location.is_some() {
                        user.location = update.location;
                    }
                    if update.about.is_some() {
                        user.about = update.about;
                    }
                    user.updated_at = *updated_at;
                }
            },
            UserAction::Activated {
                user_id,
                activated_at,
            } => {
                if let Some(user) = state.users.get_mut(user_id) {
                    user.is_activated = true;
                    user.updated_at = *activated_at;
                }
            },
            UserAction::AccountDeleted { user_id } => {
                state.last_deleted = state.users.remove(user_id);
            },
            UserAction::Followed { actor, target, at } => {
                if let Some(user) = state.users.get_mut(actor) {
                    if !user.follows(target) {
                        user.followings.insert(0, *target);
                    }
                    user.updated_at = *at;
                }
                if let Some(user) = state.users.get_mut(target) {
                    if !user.is_followed_by(actor) {
                        user.followers.insert(0, *actor);
                    }
                    user.updated_at = *at;
                }
            },
            UserAction::Unfollowed { actor, target, at }
            | UserAction::FollowerRemoved { actor, target, at }
            | UserAction::FollowerDropped {
                actor: target,
                follower: actor,
                at,
            } => {
                if let Some(user) = state.users.get_mut(actor) {
                    Self::remove_first(&mut user.followings, target);
                    user.updated_at = *at;
                }
                if let Some(user) = state.users.get_mut(target) {
                    Self::remove_first(&mut user.followers, actor);
                    user.updated_at = *at;
                }
            },
            UserAction::UserBlocked { actor, target, at } => {
                if let Some(user) = state.users.get_mut(actor) {
                    user.blocked.insert(0, *target);
                    user.updated_at = *at;
                }
            },
            UserAction::UserUnblocked { actor, target, at } => {
                if let Some(user) = state.users.get_mut(actor) {
                    Self::remove_first(&mut user.blocked, target);
                    user.updated_at = *at;
                }
            },
            UserAction::Rejected { rejection } => {
                state.last_rejection = Some(rejection.clone());
                return;
            },
            // Commands don't modify state
            UserAction::Register { .. }
            | UserAction::UpdateProfile { .. }
            | UserAction::Activate { .. }
            | UserAction::DeleteAccount { .. }
            | UserAction::Follow { .. }
            | UserAction::Unfollow { .. }
            | UserAction::RemoveFollower { .. }
            | UserAction::DropFollower { .. }
            | UserAction::Block { .. }
            | UserAction::Unblock { .. } => return,
        }
        state.last_rejection = None;
    }

    fn reject(state: &mut UserState, rejection: UserRejection) -> SmallVec<[Effect; 4]> {
        tracing::debug!(%rejection, "User command rejected");
        Self::apply_event(state, &UserAction::Rejected { rejection });
        SmallVec::new()
    }

    fn accept(state: &mut UserState, event: &UserAction) {
        tracing::debug!(event_type = event.event_type(), "User change accepted");
        Self::apply_event(state, event);
    }
}

impl Reducer for UserReducer {
    type State = UserState;
    type Action = UserAction;
    type Environment = SocialEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per command
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        match action {
            UserAction::Register {
                id,
                name,
                email,
                is_admin,
            } => match Self::validate_register(state, id, &name, &email) {
                Ok((name, email)) => {
                    tracing::info!(user_id = %id, is_admin, "User registered");
                    Self::accept(
                        state,
                        &UserAction::Registered {
                            id,
                            name,
                            email,
                            is_admin,
                            registered_at: env.clock.now(),
                        },
                    );
                    SmallVec::new()
                },
                Err(rejection) => Self::reject(state, rejection),
            },

            UserAction::UpdateProfile { user_id, update } => {
                match Self::validate_update(state, user_id, update) {
                    Ok(update) => {
                        Self::accept(
                            state,
                            &UserAction::ProfileUpdated {
                                user_id,
                                update,
                                updated_at: env.clock.now(),
                            },
                        );
                        SmallVec::new()
                    },
                    Err(rejection) => Self::reject(state, rejection),
                }
            },

            UserAction::Activate { user_id } => {
                let Some(already_active) = state.get(&user_id).map(|user| user.is_activated) else {
                    return Self::reject(state, UserRejection::UnknownUser(user_id));
                };
                if already_active {
                    state.last_rejection = None;
                    return SmallVec::new();
                }
                tracing::info!(%user_id, "Account activated");
                Self::accept(
                    state,
                    &UserAction::Activated {
                        user_id,
                        activated_at: env.clock.now(),
                    },
                );
                smallvec![notifications::publish(
                    env,
                    Audience::User(user_id),
                    Channel::AccountActivate,
                    Notification::account_activated(),
                )]
            },

            UserAction::DeleteAccount { user_id } => {
                if !state.exists(&user_id) {
                    return Self::reject(state, UserRejection::UnknownUser(user_id));
                }
                tracing::info!(%user_id, "Account deleted");
                Self::accept(state, &UserAction::AccountDeleted { user_id });
                SmallVec::new()
            },

            UserAction::Follow { actor, target } => {
                if let Err(rejection) = Self::validate_follow(state, actor, target) {
                    return Self::reject(state, rejection);
                }
                Self::accept(
                    state,
                    &UserAction::Followed {
                        actor,
                        target,
                        at: env.clock.now(),
                    },
                );
                let first_name = state
                    .get(&actor)
                    .map(|user| user.name.first.clone())
                    .unwrap_or_default();
                smallvec![notifications::publish(
                    env,
                    Audience::User(target),
                    Channel::NewFollower,
                    Notification::new_follower(&first_name),
                )]
            },

            UserAction::Unfollow { actor, target } => {
                if let Err(rejection) = Self::validate_unfollow(state, actor, target) {
                    return Self::reject(state, rejection);
                }
                Self::accept(
                    state,
                    &UserAction::Unfollowed {
                        actor,
                        target,
                        at: env.clock.now(),
                    },
                );
                SmallVec::new()
            },

            UserAction::RemoveFollower { actor, target } => {
                if let Err(rejection) = Self::validate_remove_follower(state, actor, target) {
                    return Self::reject(state, rejection);
                }
                Self::accept(
                    state,
                    &UserAction::FollowerRemoved {
                        actor,
                        target,
                        at: env.clock.now(),
                    },
                );
                SmallVec::new()
            },

            UserAction::DropFollower { actor, follower } => {
                if let Err(rejection) = Self::validate_drop_follower(state, actor, follower) {
                    return Self::reject(state, rejection);
                }
                Self::accept(
                    state,
                    &UserAction::FollowerDropped {
                        actor,
                        follower,
                        at: env.clock.now(),
                    },
                );
                SmallVec::new()
            },

            UserAction::Block {
                actor,
                actor_is_admin,
                target,
            } => {
                if let Err(rejection) = Self::validate_block(state, actor, actor_is_admin, target) {
                    return Self::reject(state, rejection);
                }
                Self::accept(
                    state,
                    &UserAction::UserBlocked {
                        actor,
                        target,
                        at: env.clock.now(),
                    },
                );
                SmallVec::new()
            },

            UserAction::Unblock {
                actor,
                actor_is_admin,
                target,
            } => {
                if let Err(rejection) = Self::validate_unblock(state, actor, actor_is_admin, target)
                {
                    return Self::reject(state, rejection);
                }
                Self::accept(
                    state,
                    &UserAction::UserUnblocked {
                        actor,
                        target,
                        at: env.clock.now(),
                    },
                );
                SmallVec::new()
            },

            // Events and rejections arriving directly are applied as-is
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}
