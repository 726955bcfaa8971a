//! Event store: the event catalogue and RSVP bookkeeping.

mod catalogue;
mod reducer;
mod rsvp;

pub use catalogue::EventManager;
pub use reducer::{
    EventAction, EventReducer, EventRejection, EventState, RsvpOutcome, RsvpPolicy,
    MAX_EVENT_NAME_LEN,
};
pub use rsvp::RsvpManager;

use crate::environment::SocialEnvironment;
use gatherly_runtime::Store;

/// Runtime store holding every event
pub type EventStore = Store<EventState, EventAction, SocialEnvironment, EventReducer>;
