//! Account lifecycle: registration, profile edits, activation, deletion.

use super::{UserAction, UserStore};
use crate::auth::AuthContext;
use crate::error::SocialError;
use crate::types::{PersonName, ProfileUpdate, User, UserId};

/// Typed facade over the user store for account operations
#[derive(Clone)]
pub struct AccountManager {
    store: UserStore,
}

impl AccountManager {
    /// Wraps a user store
    #[must_use]
    pub const fn new(store: UserStore) -> Self {
        Self { store }
    }

    async fn execute(&self, action: UserAction, subject: UserId) -> Result<User, SocialError> {
        let ((rejection, user), _effects) = self
            .store
            .send_and_inspect(action, move |state| {
                (state.last_rejection.clone(), state.get(&subject).cloned())
            })
            .await?;
        match (rejection, user) {
            (Some(rejection), _) => Err(rejection.into()),
            (None, Some(user)) => Ok(user),
            (None, None) => Err(SocialError::not_found("user", subject)),
        }
    }

    /// Register a new account
    ///
    /// Names are trimmed and the email is lowercased before storing.
    ///
    /// # Errors
    ///
    /// [`SocialError::InvalidInput`] for empty names, a malformed or already
    /// registered email, or an id that is already taken.
    #[tracing::instrument(skip(self, name, email))]
    pub async fn register(
        &self,
        id: UserId,
        name: PersonName,
        email: impl Into<String>,
        is_admin: bool,
    ) -> Result<User, SocialError> {
        let action = UserAction::Register {
            id,
            name,
            email: email.into(),
            is_admin,
        };
        self.execute(action, id).await
    }

    /// Change the caller's own profile fields
    ///
    /// # Errors
    ///
    /// [`SocialError::InvalidInput`] for an empty update or invalid values;
    /// [`SocialError::NotFound`] if the caller has no account.
    #[tracing::instrument(skip(self, ctx, update), fields(user = %ctx.user_id))]
    pub async fn update_profile(
        &self,
        ctx: &AuthContext,
        update: ProfileUpdate,
    ) -> Result<User, SocialError> {
        let action = UserAction::UpdateProfile {
            user_id: ctx.user_id,
            update,
        };
        self.execute(action, ctx.user_id).await
    }

    /// Mark an account as activated; repeating it changes nothing
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the account does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn activate_account(&self, user: UserId) -> Result<User, SocialError> {
        self.execute(UserAction::Activate { user_id: user }, user)
            .await
    }

    /// Delete the caller's account and return what was removed
    ///
    /// Other users' lists keep the id; resolved profiles skip it.
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the caller has no account.
    #[tracing::instrument(skip(self, ctx), fields(user = %ctx.user_id))]
    pub async fn delete_account(&self, ctx: &AuthContext) -> Result<User, SocialError> {
        let user_id = ctx.user_id;
        let ((rejection, removed), _effects) = self
            .store
            .send_and_inspect(UserAction::DeleteAccount { user_id }, |state| {
                (state.last_rejection.clone(), state.last_deleted.clone())
            })
            .await?;
        match (rejection, removed) {
            (Some(rejection), _) => Err(rejection.into()),
            (None, Some(user)) => Ok(user),
            (None, None) => Err(SocialError::not_found("user", user_id)),
        }
    }

    /// Look up a user
    ///
    /// # Errors
    ///
    /// [`SocialError::NotFound`] if the user does not exist.
    pub async fn get_user(&self, user: UserId) -> Result<User, SocialError> {
        self.store
            .state(|state| state.get(&user).cloned())
            .await
            .ok_or_else(|| SocialError::not_found("user", user))
    }
}
