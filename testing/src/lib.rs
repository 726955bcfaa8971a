//! # Gatherly Testing
//!
//! Testing utilities for Gatherly reducers and stores.
//!
//! This crate provides:
//! - Deterministic clocks
//! - Event buses that record or reject publishes
//! - A Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use gatherly_testing::{test_clock, RecordingEventBus};
//!
//! #[tokio::test]
//! async fn follow_notifies_target() {
//!     let bus = Arc::new(RecordingEventBus::new());
//!     let app = App::with_parts(test_clock(), bus.clone(), Config::default());
//!
//!     app.relationships().follow(&alice, bob).await?;
//!     app.settle().await;
//!
//!     assert_eq!(bus.events_on("notifications").len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use gatherly_core::environment::Clock;


pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use gatherly_core::event::SerializedEvent;
    use gatherly_core::event_bus::{EventBus, EventBusError, EventStream};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// ```
    /// use gatherly_testing::mocks::FixedClock;
    /// use gatherly_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Clones share the same time, so a test can hand one clone to the
    /// application and keep another to advance it.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Start the clock at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// The instant every test clock starts at: 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// Event bus that remembers everything published to it
    ///
    /// `subscribe` replays the recorded events for the requested topics and
    /// then ends, which lets a test drain a consumer deterministically after
    /// the stores have settled.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingEventBus {
        published: Arc<Mutex<Vec<(String, SerializedEvent)>>>,
    }

    impl RecordingEventBus {
        /// Create an empty recording bus
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every publish so far, in order, with its topic
        #[must_use]
        pub fn published(&self) -> Vec<(String, SerializedEvent)> {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Events published to one topic, in order
        #[must_use]
        pub fn events_on(&self, topic: &str) -> Vec<SerializedEvent> {
            self.published()
                .into_iter()
                .filter(|(t, _)| t == topic)
                .map(|(_, event)| event)
                .collect()
        }

        /// Forget everything recorded so far
        pub fn clear(&self) {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }

    impl EventBus for RecordingEventBus {
        fn publish(
            &self,
            topic: &str,
            event: &SerializedEvent,
        ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((topic.to_string(), event.clone()));
            Box::pin(async { Ok(()) })
        }

        fn subscribe(
            &self,
            topics: &[&str],
        ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
            let replay: Vec<SerializedEvent> = self
                .published()
                .into_iter()
                .filter(|(topic, _)| topics.contains(&topic.as_str()))
                .map(|(_, event)| event)
                .collect();

            Box::pin(async move {
                let stream = async_stream::stream! {
                    for event in replay {
                        yield Ok(event);
                    }
                };
                Ok(Box::pin(stream) as EventStream)
            })
        }
    }

    /// Event bus whose publishes always fail
    ///
    /// Used to check that a broken transport never leaks into domain state.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingEventBus;

    impl EventBus for FailingEventBus {
        fn publish(
            &self,
            topic: &str,
            _event: &SerializedEvent,
        ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
            let topic = topic.to_string();
            Box::pin(async move {
                Err(EventBusError::PublishFailed {
                    topic,
                    reason: "transport unavailable".to_string(),
                })
            })
        }

        fn subscribe(
            &self,
            topics: &[&str],
        ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
            let topics = topics.iter().map(|t| (*t).to_string()).collect();
            Box::pin(async move {
                Err(EventBusError::SubscriptionFailed {
                    topics,
                    reason: "transport unavailable".to_string(),
                })
            })
        }
    }
}

/// Test helpers
pub mod helpers {
    /// Install a fmt subscriber that writes through the test harness
    ///
    /// Safe to call from every test; only the first call installs anything.
    /// Honours `RUST_LOG` and defaults to `warn`.
    pub fn init_tracing() {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    }
}

// Re-export commonly used items
pub use helpers::init_tracing;
pub use mocks::{test_clock, test_epoch, FailingEventBus, FixedClock, ManualClock, RecordingEventBus};
