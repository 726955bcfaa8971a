//! The authenticated caller, as established by whatever sits in front of
//! the managers. Nothing here re-checks identity.

use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// Authenticated actor for one manager call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Who is acting
    pub user_id: UserId,
    /// Whether the actor holds administrative privilege
    pub is_admin: bool,
}

impl AuthContext {
    /// A regular user
    #[must_use]
    pub const fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// An administrator
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}
