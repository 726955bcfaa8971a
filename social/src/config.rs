//! Configuration management for Gatherly.
//!
//! Loads configuration from environment variables with defaults. Loading
//! never fails: a missing or unparsable variable falls back to its default.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `tracing` filter directive for the binary
    pub log_filter: String,
    /// RSVP behaviour
    pub rsvp: RsvpConfig,
    /// Notification fan-out
    pub notifications: NotificationConfig,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// RSVP configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpConfig {
    /// Let a user who already responded switch to a different choice
    pub allow_response_change: bool,
}

/// Notification configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Notifications kept per user inbox (oldest dropped first)
    pub inbox_limit: usize,
    /// Buffer of the real-time socket broadcast
    pub socket_capacity: usize,
    /// Buffer of the in-process event bus
    pub bus_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            inbox_limit: 100,
            socket_capacity: 256,
            bus_capacity: 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "gatherly=info".to_string(),
            rsvp: RsvpConfig::default(),
            notifications: NotificationConfig::default(),
            shutdown_timeout: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|value| value.trim().parse().ok());

        Self {
            log_filter: lookup("GATHERLY_LOG")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_filter),
            rsvp: RsvpConfig {
                allow_response_change: lookup("GATHERLY_RSVP_ALLOW_CHANGE")
                    .and_then(|value| parse_flag(&value))
                    .unwrap_or(defaults.rsvp.allow_response_change),
            },
            notifications: NotificationConfig {
                inbox_limit: parsed("GATHERLY_INBOX_LIMIT")
                    .unwrap_or(defaults.notifications.inbox_limit),
                socket_capacity: parsed("GATHERLY_SOCKET_CAPACITY")
                    .unwrap_or(defaults.notifications.socket_capacity),
                bus_capacity: parsed("GATHERLY_BUS_CAPACITY")
                    .unwrap_or(defaults.notifications.bus_capacity),
            },
            shutdown_timeout: lookup("GATHERLY_SHUTDOWN_TIMEOUT_SECS")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.shutdown_timeout),
        }
    }

    /// Shutdown timeout as a `Duration`
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(config_from(&[]), Config::default());
        assert!(!Config::default().rsvp.allow_response_change);
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            ("GATHERLY_LOG", "gatherly=debug"),
            ("GATHERLY_RSVP_ALLOW_CHANGE", "true"),
            ("GATHERLY_INBOX_LIMIT", "5"),
            ("GATHERLY_SOCKET_CAPACITY", "8"),
            ("GATHERLY_BUS_CAPACITY", "16"),
            ("GATHERLY_SHUTDOWN_TIMEOUT_SECS", "3"),
        ]);
        assert_eq!(config.log_filter, "gatherly=debug");
        assert!(config.rsvp.allow_response_change);
        assert_eq!(config.notifications.inbox_limit, 5);
        assert_eq!(config.notifications.socket_capacity, 8);
        assert_eq!(config.notifications.bus_capacity, 16);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn rust_log_is_a_fallback_filter() {
        let config = config_from(&[("RUST_LOG", "warn")]);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let config = config_from(&[
            ("GATHERLY_RSVP_ALLOW_CHANGE", "sometimes"),
            ("GATHERLY_INBOX_LIMIT", "lots"),
        ]);
        assert!(!config.rsvp.allow_response_change);
        assert_eq!(config.notifications.inbox_limit, 100);
    }
}
