//! Dependencies injected into every Gatherly reducer.

use gatherly_core::environment::Clock;
use gatherly_core::event_bus::EventBus;
use std::sync::Arc;

/// Clock for timestamps and the bus notifications are published on
#[derive(Clone)]
pub struct SocialEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Event bus for post-commit notifications
    pub event_bus: Arc<dyn EventBus>,
}

impl SocialEnvironment {
    /// Creates a new `SocialEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, event_bus: Arc<dyn EventBus>) -> Self {
        Self { clock, event_bus }
    }
}
