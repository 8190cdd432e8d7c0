//! Command/response session with one connected actuator.
//!
//! A session owns its link through a [`LinkGuard`]. Every command is written,
//! then the session waits (bounded by the response timeout) for the next
//! notification that decodes cleanly. Malformed notifications are dropped
//! and the wait continues; no reply in time faults the session.
//!
//! ```text
//!  Connected ──send──▶ AwaitingResponse ──reply──▶ Idle ──send──▶ ...
//!                             │
//!                             └─ write error / timeout / ERR ack ──▶ Faulted
//! ```
//!
//! Readings decoded along the way are folded into the session's
//! [`DeviceStatus`] and are kept even if a later step faults.

use am43_link::{DeviceAddress, LinkError, LinkGuard, LinkResult, RadioLink};
use am43_metrics::{metric_defs, metrics, DeviceLabels};
use am43_protocol::{hex_dump, AckCode, Command, DeviceStatus, Notification, ProtocolError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::action::BlindsAction;
use crate::cancel::CancelToken;
use crate::config::{PostActionPolicy, SessionConfig};

/// Longest single link wait, so an explicit cancel is seen promptly.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Session errors. Every one of them leaves the session faulted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The transport refused the write.
    #[error("writing {command} failed: {source}")]
    Write {
        /// Command being written.
        command: &'static str,
        /// Transport error.
        source: LinkError,
    },

    /// The link failed while waiting for a notification.
    #[error("link failed while waiting for a reply to {command}: {source}")]
    Link {
        /// Command awaiting a reply.
        command: &'static str,
        /// Transport error.
        source: LinkError,
    },

    /// No decodable notification arrived in time.
    #[error("no reply to {command} within {timeout_ms} ms")]
    Timeout {
        /// Command awaiting a reply.
        command: &'static str,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The actuator answered with an error ack.
    #[error("{command} rejected by the actuator")]
    CommandRejected {
        /// Rejected command.
        command: &'static str,
    },

    /// The actuator rejected the PIN.
    #[error("login rejected")]
    LoginRejected,

    /// The command could not be encoded.
    #[error("cannot encode {command}: {source}")]
    Encode {
        /// Command being encoded.
        command: &'static str,
        /// Encoding error.
        source: ProtocolError,
    },

    /// The caller cancelled the action.
    #[error("cancelled")]
    Cancelled,

    /// A command was issued after the session had already faulted.
    #[error("session already faulted")]
    Faulted,
}

impl SessionError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::Write { .. } => "write",
            SessionError::Link { .. } => "link",
            SessionError::Timeout { .. } => "timeout",
            SessionError::CommandRejected { .. } => "rejected",
            SessionError::LoginRejected => "login",
            SessionError::Encode { .. } => "encode",
            SessionError::Cancelled => "cancelled",
            SessionError::Faulted => "faulted",
        }
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Link is up, nothing sent yet.
    Connected,
    /// A command was written and its reply is outstanding.
    AwaitingResponse,
    /// Last exchange completed.
    Idle,
    /// A step failed. No further commands are sent.
    Faulted,
}

/// Session with one actuator.
pub struct ActuatorSession<L: RadioLink> {
    name: String,
    guard: LinkGuard<L>,
    config: SessionConfig,
    state: SessionState,
    status: DeviceStatus,
    labels: DeviceLabels,

    // Statistics
    commands_sent: u32,
    notifications_received: u32,
    decode_errors: u32,
}

impl<L: RadioLink> ActuatorSession<L> {
    /// Start a session on a connected link.
    pub fn new(name: impl Into<String>, link: L, config: SessionConfig) -> Self {
        let name = name.into();
        let labels = DeviceLabels::new(name.clone(), link.address().to_string());
        ActuatorSession {
            name,
            guard: LinkGuard::new(link),
            config,
            state: SessionState::Connected,
            status: DeviceStatus::unknown(),
            labels,
            commands_sent: 0,
            notifications_received: 0,
            decode_errors: 0,
        }
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device address.
    pub fn address(&self) -> &DeviceAddress {
        self.guard.address()
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Readings decoded so far.
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Commands written so far.
    pub fn commands_sent(&self) -> u32 {
        self.commands_sent
    }

    /// Notifications decoded so far.
    pub fn notifications_received(&self) -> u32 {
        self.notifications_received
    }

    /// Notifications dropped as malformed so far.
    pub fn decode_errors(&self) -> u32 {
        self.decode_errors
    }

    /// Release the link. Safe to call more than once.
    pub fn close(&mut self) -> LinkResult<()> {
        self.guard.close()
    }

    /// Run the full sequence for `action`: optional login, the motion
    /// command, the post-action policy, then status gathering.
    pub fn run(&mut self, action: BlindsAction, cancel: &CancelToken) -> Result<(), SessionError> {
        debug!(device = %self.name, %action, "running session");

        if let Some(pin) = self.config.pin {
            self.login(pin, cancel)?;
        }

        if let Some(command) = action.motion_command() {
            self.send_command(&command, cancel)?;
        }

        match self.config.post_action {
            PostActionPolicy::None => {}
            PostActionPolicy::CloseThenStop => {
                self.send_command(&Command::close(), cancel)?;
                self.send_command(&Command::stop(), cancel)?;
            }
        }

        self.gather_status(cancel)?;

        info!(device = %self.name, %action, status = %self.status, "session complete");
        Ok(())
    }

    /// Authenticate with `pin`.
    pub fn login(&mut self, pin: u16, cancel: &CancelToken) -> Result<(), SessionError> {
        match self.send_command(&Command::Login { pin }, cancel) {
            Ok(_) => Ok(()),
            Err(SessionError::CommandRejected { .. }) => Err(SessionError::LoginRejected),
            Err(e) => Err(e),
        }
    }

    /// Request battery, light and position, absorb trailing position
    /// frames, then acknowledge the position burst.
    pub fn gather_status(&mut self, cancel: &CancelToken) -> Result<(), SessionError> {
        self.send_command(&Command::RequestBattery, cancel)?;
        self.send_command(&Command::RequestLight, cancel)?;
        self.send_command(&Command::RequestPosition, cancel)?;

        for _ in 0..self.config.settle_notifications {
            let timeout = self.config.response_timeout();
            if let Some(notification) = self.next_notification("settle", timeout, cancel)? {
                trace!(device = %self.name, kind = notification.kind(), "settle notification");
            }
        }

        self.write_command(&Command::AcknowledgePosition, cancel)?;
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Write `command` and wait for the next decodable notification.
    ///
    /// Returns the notification that answered it. An error ack faults the
    /// session with [`SessionError::CommandRejected`].
    pub fn send_command(
        &mut self,
        command: &Command,
        cancel: &CancelToken,
    ) -> Result<Notification, SessionError> {
        let started = Instant::now();
        self.write_command(command, cancel)?;

        let timeout = self.config.response_timeout();
        let notification = match self.next_notification(command.name(), timeout, cancel)? {
            Some(notification) => notification,
            None => {
                metrics::counter!(metric_defs::SESSION_TIMEOUTS.name, &self.labels.to_labels()[..])
                    .increment(1);
                return Err(self.fault(SessionError::Timeout {
                    command: command.name(),
                    timeout_ms: self.config.response_timeout_ms,
                }));
            }
        };

        metrics::histogram!(
            metric_defs::SESSION_RESPONSE_TIME.name,
            &self.labels.to_labels()[..]
        )
        .record(started.elapsed().as_secs_f64() * 1000.0);

        if notification.ack_code() == Some(AckCode::Error) {
            return Err(self.fault(SessionError::CommandRejected {
                command: command.name(),
            }));
        }

        self.state = SessionState::Idle;
        Ok(notification)
    }

    /// Encode and write `command` without waiting for a reply.
    fn write_command(&mut self, command: &Command, cancel: &CancelToken) -> Result<(), SessionError> {
        if self.state == SessionState::Faulted {
            return Err(SessionError::Faulted);
        }
        if cancel.is_cancelled() {
            return Err(self.fault(SessionError::Cancelled));
        }

        let frame = match command.encode() {
            Ok(frame) => frame,
            Err(source) => {
                return Err(self.fault(SessionError::Encode {
                    command: command.name(),
                    source,
                }))
            }
        };

        trace!(device = %self.name, command = command.name(), "TX: {}", hex_dump(&frame));
        self.state = SessionState::AwaitingResponse;
        if let Err(source) = self.guard.link_mut().write(&frame) {
            return Err(self.fault(SessionError::Write {
                command: command.name(),
                source,
            }));
        }
        self.commands_sent += 1;
        metrics::counter!(
            metric_defs::FRAMES_TX.name,
            &self.labels.with(&[("command", command.name().to_string())])[..]
        )
        .increment(1);
        Ok(())
    }

    /// Wait up to `timeout` for the next notification that decodes.
    ///
    /// Returns `Ok(None)` when the time runs out.
    fn next_notification(
        &mut self,
        waiting_for: &'static str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Option<Notification>, SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if cancel.is_cancelled() {
                return Err(self.fault(SessionError::Cancelled));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let slice = cancel.clamp(remaining).min(CANCEL_POLL);
            let raw = match self.guard.link_mut().wait_for_notification(slice) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(source) => {
                    return Err(self.fault(SessionError::Link {
                        command: waiting_for,
                        source,
                    }))
                }
            };

            trace!(device = %self.name, "RX: {}", hex_dump(&raw));
            match Notification::from_bytes(&raw) {
                Ok(notification) => {
                    self.record(&notification);
                    return Ok(Some(notification));
                }
                Err(e) => {
                    self.decode_errors += 1;
                    metrics::counter!(
                        metric_defs::FRAMES_DECODE_ERRORS.name,
                        &self.labels.to_labels()[..]
                    )
                    .increment(1);
                    warn!(device = %self.name, error = %e, "dropping malformed notification");
                }
            }
        }
    }

    fn record(&mut self, notification: &Notification) {
        self.notifications_received += 1;
        metrics::counter!(
            metric_defs::FRAMES_RX.name,
            &self.labels.with(&[("kind", notification.kind().to_string())])[..]
        )
        .increment(1);

        if self.status.apply(notification) {
            debug!(device = %self.name, ?notification, "reading");
        }
        if let Notification::Battery(percent) = notification {
            metrics::gauge!(metric_defs::DEVICE_BATTERY.name, &self.labels.to_labels()[..])
                .set(f64::from(*percent));
        }
    }

    fn fault(&mut self, error: SessionError) -> SessionError {
        self.state = SessionState::Faulted;
        metrics::counter!(
            metric_defs::SESSION_FAULTS.name,
            &self.labels.with(&[("reason", error.reason().to_string())])[..]
        )
        .increment(1);
        warn!(device = %self.name, address = %self.guard.address(), error = %error, "session faulted");
        error
    }
}

impl<L: RadioLink> std::fmt::Debug for ActuatorSession<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorSession")
            .field("name", &self.name)
            .field("address", self.guard.address())
            .field("state", &self.state)
            .field("status", &self.status)
            .finish()
    }
}
