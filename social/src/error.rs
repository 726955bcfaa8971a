//! Errors returned by the Gatherly managers.
//!
//! Validation outcomes (already following, already responded, ...) are not
//! errors; each manager operation returns them as a typed outcome instead.

use gatherly_runtime::StoreError;
use thiserror::Error;

/// Failure of a manager operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SocialError {
    /// A referenced id does not resolve
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity ("user", "event", "post")
        entity: &'static str,
        /// The id that was looked up
        id: String,
    },

    /// The actor may not perform this action
    #[error("Forbidden: {action}")]
    Forbidden {
        /// What was attempted
        action: &'static str,
    },

    /// The request itself is malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backing store refused the operation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SocialError {
    /// Shorthand for [`SocialError::NotFound`]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
