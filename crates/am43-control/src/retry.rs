//! Bounded connection retry.

use am43_link::{Connector, DeviceAddress, LinkError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;

/// Default number of connection attempts per device.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default pause between attempts (milliseconds).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 3000;

/// A device could not be connected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "cannot connect to {address} after {attempts} attempt(s) at {}: {}",
    format_time(.at),
    failure_reason(.last_error, .cancelled)
)]
pub struct ConnectionFailed {
    /// Address that was tried.
    pub address: DeviceAddress,
    /// Attempts actually made.
    pub attempts: u32,
    /// When the policy gave up.
    pub at: DateTime<Utc>,
    /// Error from the last attempt, if any attempt was made.
    pub last_error: Option<LinkError>,
    /// Whether the policy stopped early because of cancellation.
    pub cancelled: bool,
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn failure_reason(last_error: &Option<LinkError>, cancelled: &bool) -> String {
    match (last_error, *cancelled) {
        (_, true) => "cancelled".to_string(),
        (Some(e), false) => e.to_string(),
        (None, false) => "no attempt made".to_string(),
    }
}

/// Result of a connect call plus the number of attempts it took.
#[derive(Debug)]
pub struct ConnectOutcome<L> {
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// The connected link, or why there is none.
    pub result: Result<L, ConnectionFailed>,
}

impl<L> ConnectOutcome<L> {
    /// Whether a link was obtained.
    pub fn is_connected(&self) -> bool {
        self.result.is_ok()
    }

    /// Drop the attempt count and keep the result.
    pub fn into_result(self) -> Result<L, ConnectionFailed> {
        self.result
    }
}

/// Fixed-delay, bounded connection retry.
///
/// Exactly `max_attempts` connects are made at most. The delay is slept
/// only between attempts, never after the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of connection attempts.
    pub max_attempts: u32,
    /// Pause between attempts (milliseconds).
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            delay_ms: delay.as_millis() as u64,
        }
    }

    /// Pause between attempts.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Connect to `address`, retrying per this policy.
    ///
    /// Cancellation is checked before every attempt and interrupts the delay.
    pub fn connect<C: Connector>(
        &self,
        connector: &mut C,
        address: &DeviceAddress,
        cancel: &CancelToken,
    ) -> ConnectOutcome<C::Link> {
        let max_attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return self.give_up(address, attempt - 1, last_error, true);
            }

            debug!(%address, attempt, max_attempts, "connecting");
            match connector.connect(address) {
                Ok(link) => {
                    info!(%address, attempt, "connected");
                    return ConnectOutcome {
                        attempts: attempt,
                        result: Ok(link),
                    };
                }
                Err(e) => {
                    warn!(%address, attempt, max_attempts, error = %e, "connect failed");
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts && !cancel.sleep(self.delay()) {
                return self.give_up(address, attempt, last_error, true);
            }
        }

        self.give_up(address, max_attempts, last_error, false)
    }

    fn give_up<L>(
        &self,
        address: &DeviceAddress,
        attempts: u32,
        last_error: Option<LinkError>,
        cancelled: bool,
    ) -> ConnectOutcome<L> {
        let failure = ConnectionFailed {
            address: address.clone(),
            attempts,
            at: Utc::now(),
            last_error,
            cancelled,
        };
        warn!("{}", failure);
        ConnectOutcome {
            attempts,
            result: Err(failure),
        }
    }
}
