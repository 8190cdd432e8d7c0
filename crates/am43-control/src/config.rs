//! Fleet configuration.
//!
//! ```yaml
//! devices:
//!   - name: living_room
//!     address: "02:4E:F0:E3:8A:2B"
//! session:
//!   response_timeout_ms: 1000
//!   settle_notifications: 2
//!   pin: 8888
//!   post_action: none
//! retry:
//!   max_attempts: 2
//!   delay_ms: 3000
//! ```
//!
//! Only `devices` is required. Device order is preserved and is the order
//! in which the fleet is processed.

use am43_link::DeviceAddress;
use am43_protocol::MAX_PIN;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Default time to wait for a reply to each command.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 1000;

/// Default number of bounded waits after the status requests.
pub const DEFAULT_SETTLE_NOTIFICATIONS: u32 = 2;

/// Configuration validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A device has an empty address.
    #[error("device '{0}' has an empty address")]
    EmptyAddress(String),

    /// A device has an empty name.
    #[error("device #{0} has an empty name")]
    EmptyName(usize),

    /// Two devices share a name.
    #[error("duplicate device name '{0}'")]
    DuplicateName(String),

    /// Retry policy would never attempt a connection.
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,

    /// Response timeout of zero.
    #[error("session.response_timeout_ms must be greater than 0")]
    ZeroResponseTimeout,

    /// PIN outside 0-9999.
    #[error("PIN {0} is out of range (0-{max})", max = MAX_PIN)]
    InvalidPin(u16),
}

/// Commands issued after the action-specific command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostActionPolicy {
    /// Nothing extra.
    #[default]
    None,
    /// Always drive fully closed and then stop, whatever the action was.
    CloseThenStop,
}

/// Per-device session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long to wait for a reply to each command (milliseconds).
    pub response_timeout_ms: u64,
    /// Bounded waits after the status requests, for trailing position frames.
    pub settle_notifications: u32,
    /// Login PIN. No login is performed when unset.
    pub pin: Option<u16>,
    /// Commands issued after the action.
    pub post_action: PostActionPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            settle_notifications: DEFAULT_SETTLE_NOTIFICATIONS,
            pin: None,
            post_action: PostActionPolicy::None,
        }
    }
}

impl SessionConfig {
    /// Response timeout as a [`Duration`].
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Set the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the number of settle waits.
    pub fn with_settle_notifications(mut self, count: u32) -> Self {
        self.settle_notifications = count;
        self
    }

    /// Log in with `pin` before each action.
    pub fn with_pin(mut self, pin: u16) -> Self {
        self.pin = Some(pin);
        self
    }

    /// Set the post-action policy.
    pub fn with_post_action(mut self, policy: PostActionPolicy) -> Self {
        self.post_action = policy;
        self
    }
}

/// One configured actuator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Friendly name, unique within the fleet.
    pub name: String,
    /// Wireless address.
    pub address: DeviceAddress,
}

impl DeviceEntry {
    /// Create an entry.
    pub fn new(name: impl Into<String>, address: impl Into<DeviceAddress>) -> Self {
        DeviceEntry {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Complete fleet configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Devices, processed in this order.
    pub devices: Vec<DeviceEntry>,
    /// Session settings shared by all devices.
    #[serde(default)]
    pub session: SessionConfig,
    /// Connection retry policy.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl FleetConfig {
    /// Configuration for `devices` with default session and retry settings.
    pub fn new(devices: Vec<DeviceEntry>) -> Self {
        FleetConfig {
            devices,
            ..Default::default()
        }
    }

    /// Replace the session settings.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check the configuration for values the dispatcher cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, device) in self.devices.iter().enumerate() {
            if device.name.trim().is_empty() {
                return Err(ConfigError::EmptyName(index));
            }
            if device.address.as_str().trim().is_empty() {
                return Err(ConfigError::EmptyAddress(device.name.clone()));
            }
            if !seen.insert(device.name.as_str()) {
                return Err(ConfigError::DuplicateName(device.name.clone()));
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.session.response_timeout_ms == 0 {
            return Err(ConfigError::ZeroResponseTimeout);
        }
        if let Some(pin) = self.session.pin {
            if pin > MAX_PIN {
                return Err(ConfigError::InvalidPin(pin));
            }
        }
        Ok(())
    }
}
