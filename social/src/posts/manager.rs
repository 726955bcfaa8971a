//! Writing, editing and voting on posts.

use super::{PostAction, PostRejection, PostStore, RetractOutcome, VoteOutcome};
use crate::auth::AuthContext;
use crate::error::SocialError;
use crate::types::{Page, Paged, Post, PostId, VoteDirection};

/// Typed facade over the post store
#[derive(Clone)]
pub struct PostManager {
    store: PostStore,
}

impl PostManager {
    /// Wraps a post store
    #[must_use]
    pub const fn new(store: PostStore) -> Self {
        Self { store }
    }

    async fn execute(&self, action: PostAction, subject: PostId) -> Result<Post, SocialError> {
        let ((rejection, post), _effects) = self
            .store
            .send_and_inspect(action, move |state| {
                (state.last_rejection.clone(), state.get(&subject).cloned())
            })
            .await?;
        match (rejection, post) {
            (Some(rejection), _) => Err(rejection.into()),
            (None, Some(post)) => Ok(post),
            (None, None) => Err(SocialError::not_found("post", subject)),
        }
    }

    /// Publish a post as the caller
    ///
    /// # Errors
    ///
    /// [`SocialError::InvalidInput`] for blank content or a taken id.
    #[tracing::instrument(skip(self, ctx, content), fields(author = %ctx.user_id))]
    pub async fn create_post(
        &self,
        ctx: &AuthContext,
        id: PostId,
        content: impl Into<String>,
    ) -> Result<Post, SocialError> {
        let action = PostAction::Create {
            id,
            author: ctx.user_id,
            content: content.into(),
        };
        self.execute(action, id).await
    }

    /// Replace the text of the caller's post
    ///
    /// # Errors
    ///
    /// [`SocialError::Forbidden`] unless the caller wrote it;
    /// [`SocialError::NotFound`] for an unknown post.
    #[tracing::instrument(skip(self, ctx, content), fields(actor = %ctx.user_id))]
    pub async fn edit_post(
        &self,
        ctx: &AuthContext,
        id: PostId,
        content: impl Into<String>,
    ) -> Result<Post, SocialError> {
        let action = PostAction::Edit {
            post_id: id,
            actor: ctx.user_id,
            content: content.into(),
        };
        self.execute(action, id).await
    }

    /// Remove a post; author or administrator
    ///
    /// # Errors
    ///
    /// [`SocialError::Forbidden`] for anyone else;
    /// [`SocialError::NotFound`] for an unknown post.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.user_id))]
    pub async fn delete_post(&self, ctx: &AuthContext, id: PostId) -> Result<Post, SocialError> {
        let action = PostAction::Delete {
            post_id: id,
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
            (None, Some(post)) => Ok(post),
            (None, None) => Err(SocialError::not_found("post", id)),
        }
    }

    /// Vote on a post; a user holds at most one vote per post
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] for an unknown post.
    #[tracing::instrument(skip(self, ctx), fields(voter = %ctx.user_id))]
    pub async fn vote(
        &self,
        ctx: &AuthContext,
        id: PostId,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, SocialError> {
        let action = PostAction::CastVote {
            post_id: id,
            user_id: ctx.user_id,
            direction,
        };
        let ((rejection, outcome), _effects) = self
            .store
            .send_and_inspect(action, |state| (state.last_rejection.clone(), state.last_vote))
            .await?;
        match (rejection, outcome) {
            (Some(rejection), _) => Err(rejection.into()),
            (None, Some(outcome)) => Ok(outcome),
            (None, None) => Err(PostRejection::UnknownPost(id).into()),
        }
    }

    /// Take back the caller's vote
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] for an unknown post.
    #[tracing::instrument(skip(self, ctx), fields(voter = %ctx.user_id))]
    pub async fn retract_vote(
        &self,
        ctx: &AuthContext,
        id: PostId,
    ) -> Result<RetractOutcome, SocialError> {
        let action = PostAction::RetractVote {
            post_id: id,
            user_id: ctx.user_id,
        };
        let ((rejection, outcome), _effects) = self
            .store
            .send_and_inspect(action, |state| (state.last_rejection.clone(), state.last_retract))
            .await?;
        match (rejection, outcome) {
            (Some(rejection), _) => Err(rejection.into()),
            (None, Some(outcome)) => Ok(outcome),
            (None, None) => Err(PostRejection::UnknownPost(id).into()),
        }
    }

    /// Look up a post
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the post does not exist.
    pub async fn get_post(&self, id: PostId) -> Result<Post, SocialError> {
        self.store
            .state(|state| state.get(&id).cloned())
            .await
            .ok_or_else(|| SocialError::not_found("post", id))
    }

    /// Posts, newest first
    pub async fn list_posts(&self, page: Page) -> Paged<Post> {
        self.store.state(|state| state.list(page)).await
    }
}
