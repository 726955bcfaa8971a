//! # Gatherly
//!
//! Social backend core: user accounts with follow and block relationships,
//! events with RSVP tracking, posts with votes, and best-effort notifications.
//!
//! Each document kind lives in its own runtime [`Store`](gatherly_runtime::Store)
//! driven by a reducer. A reducer step runs under the store's write lock, so
//! every operation below is one atomic read-modify-write:
//!
//! ```text
//! caller ──► Manager ──► Store::send_and_inspect ──► Reducer
//!              ▲                  │                     │
//!              └── typed outcome ─┘                     ▼
//!                                              Effect (post-commit)
//!                                                       │
//!                                              EventBus "notifications"
//!                                                       │
//!                                              NotificationDispatcher
//!                                                ├─► InboxNotifier
//!                                                └─► SocketNotifier
//! ```
//!
//! Validation outcomes (already following, already responded, not blocked)
//! come back as outcome enums. Only unknown ids, missing privilege, malformed
//! input and store failures are [`SocialError`]s.

pub mod app;
pub mod auth;
pub mod config;
pub mod environment;
pub mod error;
pub mod events;
pub mod identity;
pub mod notifications;
pub mod posts;
pub mod types;

pub use app::App;
pub use auth::AuthContext;
pub use config::Config;
pub use environment::SocialEnvironment;
pub use error::SocialError;
