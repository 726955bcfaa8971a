//! Post store: short posts with up and down votes.

mod manager;
mod reducer;

pub use manager::PostManager;
pub use reducer::{PostAction, PostReducer, PostRejection, PostState, RetractOutcome, VoteOutcome};

use crate::environment::SocialEnvironment;
use gatherly_runtime::Store;

/// Runtime store holding every post
pub type PostStore = Store<PostState, PostAction, SocialEnvironment, PostReducer>;
