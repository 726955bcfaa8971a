//! Identity store: user accounts and their follow / block relationships.

mod accounts;
mod reducer;
mod relationships;

pub use accounts::AccountManager;
pub use reducer::{UserAction, UserReducer, UserRejection, UserState};
pub use relationships::{
    BlockOutcome, DropFollowerOutcome, FollowOutcome, RelationshipManager, RemoveFollowerOutcome,
    UnblockOutcome, UnfollowOutcome,
};

use crate::environment::SocialEnvironment;
use gatherly_runtime::Store;

/// Runtime store holding every user
pub type UserStore = Store<UserState, UserAction, SocialEnvironment, UserReducer>;
