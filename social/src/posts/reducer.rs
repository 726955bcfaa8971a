//! Post reducer: authoring and one-vote-per-user voting.

use crate::environment::SocialEnvironment;
use crate::error::SocialError;
use crate::types::{Page, Paged, Post, PostId, UserId, Vote, VoteDirection};
use chrono::{DateTime, Utc};
use gatherly_core::{effect::Effect, reducer::Reducer, SmallVec};
use gatherly_macros::Action;
use std::collections::HashMap;
use thiserror::Error;

/// Result of casting a vote
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First vote by this user on the post
    Cast(VoteDirection),
    /// The user's vote flipped direction
    Switched(VoteDirection),
    /// The same vote was already there; nothing changed
    AlreadyVoted(VoteDirection),
}

/// Result of retracting a vote
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetractOutcome {
    /// The vote was removed
    Retracted(VoteDirection),
    /// The user had not voted
    NoVote,
}

/// Every post, keyed by id
#[derive(Clone, Debug, Default)]
pub struct PostState {
    /// All posts indexed by ID
    pub posts: HashMap<PostId, Post>,
    /// Why the last command was refused, if it was
    pub last_rejection: Option<PostRejection>,
    /// Outcome of the last vote
    pub last_vote: Option<VoteOutcome>,
    /// Outcome of the last retraction
    pub last_retract: Option<RetractOutcome>,
    /// The post removed by the most recent deletion
    pub last_deleted: Option<Post>,
}

impl PostState {
    /// Creates an empty `PostState`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a post by ID
    #[must_use]
    pub fn get(&self, id: &PostId) -> Option<&Post> {
        self.posts.get(id)
    }

    /// Posts, newest first
    #[must_use]
    pub fn list(&self, page: Page) -> Paged<Post> {
        let mut posts: Vec<Post> = self.posts.values().cloned().collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Paged::from_sorted(posts, page)
    }
}

/// Why a post command was refused
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum PostRejection {
    /// The id does not resolve to a post
    #[error("post {0} not found")]
    UnknownPost(PostId),
    /// The id is already used
    #[error("post {0} already exists")]
    DuplicatePost(PostId),
    /// Only the author may do this
    #[error("only the author can {0}")]
    NotAuthor(&'static str),
    /// Only the author or an administrator may do this
    #[error("only the author or an administrator can {0}")]
    NotAuthorOrAdmin(&'static str),
    /// Blank content
    #[error("post content is required")]
    EmptyContent,
}

impl From<PostRejection> for SocialError {
    fn from(rejection: PostRejection) -> Self {
        match rejection {
            PostRejection::UnknownPost(id) => Self::not_found("post", id),
            PostRejection::NotAuthor(action) | PostRejection::NotAuthorOrAdmin(action) => {
                Self::Forbidden { action }
            },
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

/// Commands, accepted changes and rejections for the post store
#[derive(Action, Clone, Debug, PartialEq)]
pub enum PostAction {
    /// Publish a post
    #[command]
    Create {
        /// Identifier for the new post
        id: PostId,
        /// Author
        author: UserId,
        /// Body text
        content: String,
    },

    /// Replace a post's text
    #[command]
    Edit {
        /// Post
        post_id: PostId,
        /// Who is editing
        actor: UserId,
        /// New body text
        content: String,
    },

    /// Remove a post
    #[command]
    Delete {
        /// Post
        post_id: PostId,
        /// Who is deleting
        actor: UserId,
        /// Privilege flag from the caller's auth context
        actor_is_admin: bool,
    },

    /// Vote on a post
    #[command]
    CastVote {
        /// Post
        post_id: PostId,
        /// Voter
        user_id: UserId,
        /// Up or down
        direction: VoteDirection,
    },

    /// Take a vote back
    #[command]
    RetractVote {
        /// Post
        post_id: PostId,
        /// Voter
        user_id: UserId,
    },

    /// A post was published
    #[event]
    Created {
        /// The new post
        post: Post,
    },

    /// A post's text changed
    #[event]
    Edited {
        /// Post
        post_id: PostId,
        /// New text, trimmed
        content: String,
        /// When
        edited_at: DateTime<Utc>,
    },

    /// A post was removed
    #[event]
    Deleted {
        /// Post
        post_id: PostId,
    },

    /// A first vote was recorded
    #[event]
    VoteCast {
        /// Post
        post_id: PostId,
        /// Voter
        user_id: UserId,
        /// Direction
        direction: VoteDirection,
    },

    /// An existing vote flipped
    #[event]
    VoteSwitched {
        /// Post
        post_id: PostId,
        /// Voter
        user_id: UserId,
        /// New direction
        direction: VoteDirection,
    },

    /// A vote was removed
    #[event]
    VoteRetracted {
        /// Post
        post_id: PostId,
        /// Voter
        user_id: UserId,
        /// Direction of the removed vote
        direction: VoteDirection,
    },

    /// A command was refused
    #[rejection]
    Rejected {
        /// Why
        rejection: PostRejection,
    },

    /// The same vote was cast twice
    #[rejection]
    DuplicateVote {
        /// The vote already in place
        direction: VoteDirection,
    },

    /// A retraction found no vote
    #[rejection]
    NothingToRetract,
}

/// Reducer for the post store
#[derive(Clone, Debug, Default)]
pub struct PostReducer;

impl PostReducer {
    /// Creates a new `PostReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn require(state: &PostState, id: PostId) -> Result<&Post, PostRejection> {
        state.get(&id).ok_or(PostRejection::UnknownPost(id))
    }

    fn validate_content(content: &str) -> Result<String, PostRejection> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PostRejection::EmptyContent);
        }
        Ok(content.to_string())
    }

    fn apply_event(state: &mut PostState, action: &PostAction) {
        if action.is_command() {
            return;
        }
        state.last_rejection = None;
        state.last_vote = None;
        state.last_retract = None;

        match action {
            PostAction::Created { post } => {
                state.posts.insert(post.id, post.clone());
            },
            PostAction::Edited {
                post_id,
                content,
                edited_at,
            } => {
                if let Some(post) = state.posts.get_mut(post_id) {
                    post.content.clone_from(content);
                    post.updated_at = *edited_at;
                }
            },
            PostAction::Deleted { post_id } => {
                state.last_deleted = state.posts.remove(post_id);
            },
            PostAction::VoteCast {
                post_id,
                user_id,
                direction,
            } => {
                if let Some(post) = state.posts.get_mut(post_id) {
                    post.votes.push(Vote {
                        user_id: *user_id,
                        direction: *direction,
                    });
                }
                state.last_vote = Some(VoteOutcome::Cast(*direction));
            },
            PostAction::VoteSwitched {
                post_id,
                user_id,
                direction,
            } => {
                if let Some(vote) = state
                    .posts
                    .get_mut(post_id)
                    .and_then(|post| post.votes.iter_mut().find(|vote| vote.user_id == *user_id))
                {
                    vote.direction = *direction;
                }
                state.last_vote = Some(VoteOutcome::Switched(*direction));
            },
            PostAction::VoteRetracted {
                post_id,
                user_id,
                direction,
            } => {
                if let Some(post) = state.posts.get_mut(post_id) {
                    post.votes.retain(|vote| vote.user_id != *user_id);
                }
                state.last_retract = Some(RetractOutcome::Retracted(*direction));
            },
            PostAction::Rejected { rejection } => {
                state.last_rejection = Some(rejection.clone());
            },
            PostAction::DuplicateVote { direction } => {
                state.last_vote = Some(VoteOutcome::AlreadyVoted(*direction));
            },
            PostAction::NothingToRetract => {
                state.last_retract = Some(RetractOutcome::NoVote);
            },
            PostAction::Create { .. }
            | PostAction::Edit { .. }
            | PostAction::Delete { .. }
            | PostAction::CastVote { .. }
            | PostAction::RetractVote { .. } => {},
        }
    }

    fn decide(state: &PostState, action: PostAction, now: DateTime<Utc>) -> Result<PostAction, PostRejection> {
        match action {
            PostAction::Create { id, author, content } => {
                if state.get(&id).is_some() {
                    return Err(PostRejection::DuplicatePost(id));
                }
                Ok(PostAction::Created {
                    post: Post {
                        id,
                        author,
                        content: Self::validate_content(&content)?,
                        votes: Vec::new(),
                        created_at: now,
                        updated_at: now,
                    },
                })
            },
            PostAction::Edit {
                post_id,
                actor,
                content,
            } => {
                let post = Self::require(state, post_id)?;
                if post.author != actor {
                    return Err(PostRejection::NotAuthor("edit the post"));
                }
                Ok(PostAction::Edited {
                    post_id,
                    content: Self::validate_content(&content)?,
                    edited_at: now,
                })
            },
            PostAction::Delete {
                post_id,
                actor,
                actor_is_admin,
            } => {
                let post = Self::require(state, post_id)?;
                if post.author != actor && !actor_is_admin {
                    return Err(PostRejection::NotAuthorOrAdmin("delete the post"));
                }
                Ok(PostAction::Deleted { post_id })
            },
            PostAction::CastVote {
                post_id,
                user_id,
                direction,
            } => {
                let post = Self::require(state, post_id)?;
                Ok(match post.vote_of(&user_id) {
                    None => PostAction::VoteCast {
                        post_id,
                        user_id,
                        direction,
                    },
                    Some(current) if current == direction => PostAction::DuplicateVote { direction },
                    Some(_) => PostAction::VoteSwitched {
                        post_id,
                        user_id,
                        direction,
                    },
                })
            },
            PostAction::RetractVote { post_id, user_id } => {
                let post = Self::require(state, post_id)?;
                Ok(match post.vote_of(&user_id) {
                    Some(direction) => PostAction::VoteRetracted {
                        post_id,
                        user_id,
                        direction,
                    },
                    None => PostAction::NothingToRetract,
                })
            },
            other => Ok(other),
        }
    }
}

impl Reducer for PostReducer {
    type State = PostState;
    type Action = PostAction;
    type Environment = SocialEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        match Self::decide(state, action, env.clock.now()) {
            Ok(outcome) => {
                if outcome.is_event() {
                    tracing::debug!(event_type = outcome.event_type(), "Post change accepted");
                }
                Self::apply_event(state, &outcome);
            },
            Err(rejection) => {
                tracing::debug!(%rejection, "Post command rejected");
                Self::apply_event(state, &PostAction::Rejected { rejection });
            },
        }
        SmallVec::new()
    }
}
