//! # Gatherly Core
//!
//! Core traits and types shared by every Gatherly crate.
//!
//! Business logic lives in reducers: pure functions that validate an action,
//! mutate state in place and describe the side effects that should follow.
//! The runtime crate executes those descriptions.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state owned by one store (users, events, posts)
//! - **Action**: Commands, the events they produce, and rejections
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```ignore
//! use gatherly_core::*;
//!
//! impl Reducer for UserReducer {
//!     type State = UserState;
//!     type Action = UserAction;
//!     type Environment = SocialEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut UserState,
//!         action: UserAction,
//!         env: &SocialEnvironment,
//!     ) -> SmallVec<[Effect; 4]> {
//!         // Validate, apply, describe notifications
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Event trait and the bincode wire format shared with the event bus
pub mod event;

/// Publish/subscribe abstraction used for post-commit notifications
pub mod event_bus;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for EventReducer {
    ///     type State = EventState;
    ///     type Action = EventAction;
    ///     type Environment = SocialEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut EventState,
    ///         action: EventAction,
    ///         env: &SocialEnvironment,
    ///     ) -> SmallVec<[Effect; 4]> {
    ///         match action {
    ///             EventAction::Respond { event_id, user_id, choice } => {
    ///                 // Business logic here
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most reducers produce zero to two effects, so the return type keeps
        /// up to four inline without allocating.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe work to be performed by the runtime once a reducer step
/// has committed. They are values, returned from reducers and executed by the
/// Store after the state lock is released.
pub mod effect {
    use futures::future::BoxFuture;
    use std::future::Future;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime. An effect never feeds
    /// an action back into its store: anything it learns is published, not reduced.
    pub enum Effect {
        /// No-op effect
        None,

        /// Fire-and-forget async computation, typically a publish on the event bus
        Future(BoxFuture<'static, ()>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl std::fmt::Debug for Effect {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl Effect {
        /// Wrap a future to run after the reducer step commits
        #[must_use]
        pub fn detached<F>(future: F) -> Effect
        where
            F: Future<Output = ()> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use gatherly_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let first = clock.now();
    /// assert!(clock.now() >= first);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
