//! # Gatherly Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Owns one state value, runs the reducer under a write lock and
//!   executes the returned effects
//! - **Effect Executor**: Runs effect descriptions on the tokio runtime once
//!   the reducer step has committed
//! - **`LocalEventBus`**: In-process publish/subscribe transport
//!
//! Every reducer step for a given store runs under that store's write lock.
//! Two concurrent `send` calls against the same store can therefore never
//! both observe the pre-mutation state.
//!
//! ## Example
//!
//! ```ignore
//! use gatherly_runtime::Store;
//!
//! let store = Store::new(EventState::new(), EventReducer::new(), environment);
//!
//! // Send an action
//! store.send(EventAction::Respond { event_id, user_id, choice }).await?;
//!
//! // Read state
//! let count = store.state(|s| s.count()).await;
//! ```

use gatherly_core::{effect::Effect, reducer::Reducer, SmallVec};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// In-process event bus built on tokio broadcast channels
pub mod event_bus;

pub use event_bus::LocalEventBus;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timed out waiting for effects to complete
        #[error("Timeout waiting for effects")]
        Timeout,
    }
}

pub use error::StoreError;

/// Count of in-flight effects, observable through a watch channel
#[derive(Clone)]
struct EffectCounter(Arc<watch::Sender<usize>>);

impl EffectCounter {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self(Arc::new(tx))
    }

    fn increment(&self) {
        self.0.send_modify(|count| *count += 1);
    }

    fn decrement(&self) {
        self.0.send_modify(|count| *count = count.saturating_sub(1));
    }

    fn pending(&self) -> usize {
        *self.0.borrow()
    }

    async fn wait_idle(&self) {
        let mut rx = self.0.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

/// Tracking context carried through effect execution.
///
/// Each effect counts against the handle returned to the caller of `send`
/// and against the store-wide counter used by `settle` and `shutdown`.
#[derive(Clone)]
struct Tracking {
    handle: EffectCounter,
    global: EffectCounter,
}

impl Tracking {
    fn begin(&self) -> TrackingGuard {
        self.handle.increment();
        self.global.increment();
        TrackingGuard(self.clone())
    }
}

/// Decrements both counters on drop, even if the effect task panics
struct TrackingGuard(Tracking);

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        self.0.handle.decrement();
        self.0.global.decrement();
    }
}

/// Handle for waiting on the effects started by one `send`
#[derive(Clone)]
pub struct EffectHandle {
    counter: EffectCounter,
}

impl EffectHandle {
    /// A handle with nothing left to wait for
    #[must_use]
    pub fn completed() -> Self {
        Self {
            counter: EffectCounter::new(),
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.counter.pending()
    }

    /// Wait until every tracked effect has finished
    pub async fn wait(&self) {
        self.counter.wait_idle().await;
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when
    /// `timeout` elapses.
    pub async fn wait_with_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish()
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, Duration, Effect, EffectCounter, EffectHandle, Ordering, Reducer, RwLock,
        SmallVec, StoreError, Tracking,
    };

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (after the write lock is released)
    ///
    /// Cloning a Store is cheap and yields another handle to the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        shutdown: Arc<AtomicBool>,
        pending: EffectCounter,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                shutdown: Arc::clone(&self.shutdown),
                pending: self.pending.clone(),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending: EffectCounter::new(),
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Releases the lock and starts the returned effects
        ///
        /// `send()` returns once effects are started, not finished. Use the
        /// returned [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.send_and_inspect(action, |_| ())
                .await
                .map(|((), handle)| handle)
        }

        /// Send an action and read state before any other action can run
        ///
        /// `inspect` runs while the write lock taken for the reducer is still
        /// held, so the value it returns reflects exactly this action's
        /// outcome. This is how request-style callers turn a reducer step into
        /// a typed result.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        ///
        /// # Example
        ///
        /// ```ignore
        /// let (rejection, handle) = store
        ///     .send_and_inspect(action, |s| s.last_rejection.clone())
        ///     .await?;
        /// ```
        #[tracing::instrument(skip_all, name = "store_send")]
        pub async fn send_and_inspect<F, T>(
            &self,
            action: A,
            inspect: F,
        ) -> Result<(T, EffectHandle), StoreError>
        where
            F: FnOnce(&S) -> T + Send,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            let handle = EffectCounter::new();
            let tracking = Tracking {
                handle: handle.clone(),
                global: self.pending.clone(),
            };

            let (value, effects) = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");
                let effects = self.run_reducer(&mut state, action);
                (inspect(&state), effects)
            };

            tracing::trace!("Executing {} effects", effects.len());
            for effect in effects {
                Self::execute(effect, &tracking);
            }

            Ok((value, EffectHandle { counter: handle }))
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let user_count = store.state(|s| s.count()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Number of effects currently running across all sends
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending.pending()
        }

        /// Wait until no effect started by this store is still running
        pub async fn settle(&self) {
            self.pending.wait_idle().await;
        }

        /// Stop accepting actions and wait for running effects
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// when `timeout` elapses.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            if tokio::time::timeout(timeout, self.settle()).await.is_err() {
                let pending = self.pending.pending();
                tracing::error!(pending_effects = pending, "Shutdown timed out");
                return Err(StoreError::ShutdownTimeout(pending));
            }

            tracing::info!("All effects completed, shutdown successful");
            Ok(())
        }

        fn run_reducer(&self, state: &mut S, action: A) -> SmallVec<[Effect; 4]> {
            let span = tracing::debug_span!("reducer_execution");
            let _enter = span.enter();

            metrics::counter!("store.actions.total").increment(1);
            let start = std::time::Instant::now();
            let effects = self.reducer.reduce(state, action, &self.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(start.elapsed().as_secs_f64());

            tracing::trace!("Reducer completed, returned {} effects", effects.len());
            effects
        }

        /// Start an effect without waiting for it
        fn execute(effect: Effect, tracking: &Tracking) {
            match effect {
                Effect::None => {},
                Effect::Future(future) => {
                    metrics::counter!("store.effects.total").increment(1);
                    let guard = tracking.begin();
                    tokio::spawn(async move {
                        let _guard = guard;
                        future.await;
                    });
                },
            }
        }
    }
}

pub use store::Store;
