//! Follow, unfollow, block and unblock with typed outcomes.

use super::{UserAction, UserRejection, UserStore};
use crate::auth::AuthContext;
use crate::error::SocialError;
use crate::types::{UserId, UserProfile};

/// Result of [`RelationshipManager::follow_user`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FollowOutcome {
    /// The edge was added; carries the followed user's profile
    Followed(UserProfile),
    /// The edge already existed; nothing changed
    AlreadyFollowing(UserProfile),
    /// The actor tried to follow themselves; nothing changed
    SelfFollowRejected,
}

/// Result of [`RelationshipManager::unfollow_user`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnfollowOutcome {
    /// The edge was removed on both sides; carries the target's profile if
    /// the target still exists
    Unfollowed(Option<UserProfile>),
    /// There was no edge
    NotFollowing,
}

/// Result of [`RelationshipManager::remove_follower`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoveFollowerOutcome {
    /// The actor left the target's followers; carries the target's profile
    Removed(UserProfile),
    /// The actor was not among the target's followers
    NotFollowing,
}

/// Result of [`RelationshipManager::drop_follower`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropFollowerOutcome {
    /// The follower was dropped; carries the actor's profile
    Dropped(UserProfile),
    /// The user was not a follower
    NotAFollower,
}

/// Result of [`RelationshipManager::block_user`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The target was added to the actor's blocked list
    Blocked(UserProfile),
    /// The target was already blocked; nothing changed
    AlreadyBlocked(UserProfile),
}

/// Result of [`RelationshipManager::unblock_user`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnblockOutcome {
    /// The target was removed from the actor's blocked list
    Unblocked(UserProfile),
    /// The target was not blocked; the list is untouched
    NotBlocked,
}

/// Typed facade over the user store for relationship changes
///
/// Each call is one reducer step. The rejection and the resolved profile are
/// read under the same lock as the change, so the outcome always describes
/// this call and not a later one.
#[derive(Clone)]
pub struct RelationshipManager {
    store: UserStore,
}

impl RelationshipManager {
    /// Wraps a user store
    #[must_use]
    pub const fn new(store: UserStore) -> Self {
        Self { store }
    }

    async fn execute(
        &self,
        action: UserAction,
        subject: UserId,
    ) -> Result<(Option<UserRejection>, Option<UserProfile>), SocialError> {
        let (result, _effects) = self
            .store
            .send_and_inspect(action, move |state| {
                (state.last_rejection.clone(), state.profile(&subject))
            })
            .await?;
        Ok(result)
    }

    /// Follow `target` as `ctx.user_id`
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if either user is unknown.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.user_id))]
    pub async fn follow_user(
        &self,
        ctx: &AuthContext,
        target: UserId,
    ) -> Result<FollowOutcome, SocialError> {
        let action = UserAction::Follow {
            actor: ctx.user_id,
            target,
        };
        match self.execute(action, target).await? {
            (None, Some(profile)) => Ok(FollowOutcome::Followed(profile)),
            (Some(UserRejection::AlreadyFollowing), Some(profile)) => {
                Ok(FollowOutcome::AlreadyFollowing(profile))
            },
            (Some(UserRejection::SelfFollow), _) => Ok(FollowOutcome::SelfFollowRejected),
            (Some(rejection), _) => Err(rejection.into()),
            (None, None) => Err(SocialError::not_found("user", target)),
        }
    }

    /// Stop following `target`, removing the edge on both sides
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the actor is unknown, or if the target is
    /// unknown and not followed.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.user_id))]
    pub async fn unfollow_user(
        &self,
        ctx: &AuthContext,
        target: UserId,
    ) -> Result<UnfollowOutcome, SocialError> {
        let action = UserAction::Unfollow {
            actor: ctx.user_id,
            target,
        };
        match self.execute(action, target).await? {
            (None, profile) => Ok(UnfollowOutcome::Unfollowed(profile)),
            (Some(UserRejection::NotFollowing), _) => Ok(UnfollowOutcome::NotFollowing),
            (Some(rejection), _) => Err(rejection.into()),
        }
    }

    /// Take `ctx.user_id` off `target`'s follower list
    ///
    /// The matching entry in the actor's followings goes in the same step.
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the target is unknown.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.user_id))]
    pub async fn remove_follower(
        &self,
        ctx: &AuthContext,
        target: UserId,
    ) -> Result<RemoveFollowerOutcome, SocialError> {
        let action = UserAction::RemoveFollower {
            actor: ctx.user_id,
            target,
        };
        match self.execute(action, target).await? {
            (None, Some(profile)) => Ok(RemoveFollowerOutcome::Removed(profile)),
            (Some(UserRejection::NotFollowing), _) => Ok(RemoveFollowerOutcome::NotFollowing),
            (Some(rejection), _) => Err(rejection.into()),
            (None, None) => Err(SocialError::not_found("user", target)),
        }
    }

    /// Drop `follower` from the actor's own followers, on both sides
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the actor is unknown, or if the follower
    /// is unknown and not listed.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.user_id))]
    pub async fn drop_follower(
        &self,
        ctx: &AuthContext,
        follower: UserId,
    ) -> Result<DropFollowerOutcome, SocialError> {
        let action = UserAction::DropFollower {
            actor: ctx.user_id,
            follower,
        };
        match self.execute(action, ctx.user_id).await? {
            (None, Some(profile)) => Ok(DropFollowerOutcome::Dropped(profile)),
            (Some(UserRejection::NotAFollower), _) => Ok(DropFollowerOutcome::NotAFollower),
            (Some(rejection), _) => Err(rejection.into()),
            (None, None) => Err(SocialError::not_found("user", ctx.user_id)),
        }
    }

    /// Block `target`; administrators only
    ///
    /// # Errors
    ///
    /// [`SocialError::Forbidden`] unless `ctx.is_admin`;
    /// [`SocialError::NotFound`] if either user is unknown.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.user_id))]
    pub async fn block_user(
        &self,
        ctx: &AuthContext,
        target: UserId,
    ) -> Result<BlockOutcome, SocialError> {
        let action = UserAction::Block {
            actor: ctx.user_id,
            actor_is_admin: ctx.is_admin,
            target,
        };
        match self.execute(action, ctx.user_id).await? {
            (None, Some(profile)) => Ok(BlockOutcome::Blocked(profile)),
            (Some(UserRejection::AlreadyBlocked), Some(profile)) => {
                Ok(BlockOutcome::AlreadyBlocked(profile))
            },
            (Some(rejection), _) => Err(rejection.into()),
            (None, None) => Err(SocialError::not_found("user", ctx.user_id)),
        }
    }

    /// Unblock `target`; administrators only
    ///
    /// # Errors
    ///
    /// [`SocialError::Forbidden`] unless `ctx.is_admin`;
    /// [`SocialError::NotFound`] if the actor is unknown.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.user_id))]
    pub async fn unblock_user(
        &self,
        ctx: &AuthContext,
        target: UserId,
    ) -> Result<UnblockOutcome, SocialError> {
        let action = UserAction::Unblock {
            actor: ctx.user_id,
            actor_is_admin: ctx.is_admin,
            target,
        };
        match self.execute(action, ctx.user_id).await? {
            (None, Some(profile)) => Ok(UnblockOutcome::Unblocked(profile)),
            (Some(UserRejection::NotBlocked), _) => Ok(UnblockOutcome::NotBlocked),
            (Some(rejection), _) => Err(rejection.into()),
            (None, None) => Err(SocialError::not_found("user", ctx.user_id)),
        }
    }

    /// A user with relationship lists resolved to summaries
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the user is unknown.
    pub async fn profile(&self, user: UserId) -> Result<UserProfile, SocialError> {
        self.store
            .state(|state| state.profile(&user))
            .await
            .ok_or_else(|| SocialError::not_found("user", user))
    }
}
