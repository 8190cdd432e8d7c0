//! Fleet dispatcher.
//!
//! Runs one action across every configured actuator, strictly in
//! configuration order and one connection at a time. A device that cannot
//! be reached, or whose session faults, is recorded in its [`DeviceReport`]
//! and the dispatcher moves on to the next one.

use am43_link::{Connector, DeviceAddress};
use am43_metrics::{metric_defs, metrics, DeviceLabels};
use am43_protocol::DeviceStatus;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{info, info_span, warn};

use crate::action::BlindsAction;
use crate::cancel::CancelToken;
use crate::config::{ConfigError, FleetConfig};
use crate::retry::ConnectionFailed;
use crate::session::{ActuatorSession, SessionError};

/// Why one device did not complete its action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The device could not be connected.
    #[error(transparent)]
    Connection(#[from] ConnectionFailed),

    /// The session faulted.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result for one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    /// Configured name.
    pub name: String,
    /// Address.
    pub address: DeviceAddress,
    /// Connection attempts made.
    pub attempts: u32,
    /// Readings decoded from this device, possibly partial.
    pub status: DeviceStatus,
    /// Failure, if the device did not complete.
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<DeviceError>,
}

impl DeviceReport {
    /// Whether the device completed its action.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

fn serialize_error<S: Serializer>(error: &Option<DeviceError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

/// Result of one fleet action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    /// Action that was performed.
    pub action: BlindsAction,
    /// Whether the last processed device succeeded. `false` when no device
    /// was processed.
    pub success: bool,
    /// Every configured device succeeded (and at least one was configured).
    pub all_succeeded: bool,
    /// At least one device succeeded.
    pub any_succeeded: bool,
    /// Readings merged across devices, later devices overwriting earlier ones.
    pub status: DeviceStatus,
    /// Per-device results, in processing order.
    pub devices: Vec<DeviceReport>,
    /// The action was cancelled before every device was processed.
    pub cancelled: bool,
}

impl ActionOutcome {
    /// Reports of devices that did not complete.
    pub fn failures(&self) -> impl Iterator<Item = &DeviceReport> {
        self.devices.iter().filter(|d| !d.succeeded())
    }
}

/// Runs actions across a fleet of actuators.
pub struct FleetDispatcher<C: Connector> {
    connector: C,
    config: FleetConfig,
}

impl<C: Connector> FleetDispatcher<C> {
    /// Create a dispatcher. The configuration is validated first.
    pub fn new(connector: C, config: FleetConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(FleetDispatcher { connector, config })
    }

    /// The fleet configuration.
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// The underlying connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Mutable access to the underlying connector.
    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Perform the action called `name`. Unknown names report status.
    pub fn perform_action(&mut self, name: &str, cancel: &CancelToken) -> ActionOutcome {
        self.dispatch(BlindsAction::parse(name), cancel)
    }

    /// Perform `action` on every configured device.
    pub fn dispatch(&mut self, action: BlindsAction, cancel: &CancelToken) -> ActionOutcome {
        let mut status = DeviceStatus::unknown();
        let mut devices = Vec::with_capacity(self.config.devices.len());
        let mut cancelled = false;

        info!(%action, devices = self.config.devices.len(), "dispatching");

        for device in &self.config.devices {
            if cancel.is_cancelled() {
                cancelled = true;
                warn!(
                    %action,
                    remaining = self.config.devices.len() - devices.len(),
                    "cancelled, skipping remaining devices"
                );
                break;
            }

            let _span =
                info_span!("device", device = %device.name, address = %device.address).entered();
            let labels = DeviceLabels::new(device.name.clone(), device.address.to_string());

            let outcome = self
                .config
                .retry
                .connect(&mut self.connector, &device.address, cancel);
            metrics::counter!(metric_defs::CONNECT_ATTEMPTS.name, &labels.to_labels()[..])
                .increment(u64::from(outcome.attempts));
            let attempts = outcome.attempts;

            let link = match outcome.result {
                Ok(link) => link,
                Err(failure) => {
                    metrics::counter!(metric_defs::CONNECT_FAILURES.name, &labels.to_labels()[..])
                        .increment(1);
                    cancelled |= failure.cancelled;
                    devices.push(DeviceReport {
                        name: device.name.clone(),
                        address: device.address.clone(),
                        attempts,
                        status: DeviceStatus::unknown(),
                        error: Some(failure.into()),
                    });
                    continue;
                }
            };

            let mut session =
                ActuatorSession::new(device.name.clone(), link, self.config.session.clone());
            let result = session.run(action, cancel);
            if let Err(e) = session.close() {
                warn!(error = %e, "disconnect failed");
            }

            let device_status = session.status();
            status.merge(&device_status);
            cancelled |= result == Err(SessionError::Cancelled);

            devices.push(DeviceReport {
                name: device.name.clone(),
                address: device.address.clone(),
                attempts,
                status: device_status,
                error: result.err().map(DeviceError::from),
            });
        }

        let success = devices.last().is_some_and(DeviceReport::succeeded);
        let all_succeeded = !devices.is_empty()
            && devices.len() == self.config.devices.len()
            && devices.iter().all(DeviceReport::succeeded);
        let any_succeeded = devices.iter().any(DeviceReport::succeeded);

        metrics::counter!(
            metric_defs::FLEET_ACTIONS.name,
            "action" => action.as_str(),
            "result" => if success { "success" } else { "error" }
        )
        .increment(1);
        info!(%action, success, all_succeeded, any_succeeded, cancelled, %status, "action finished");

        ActionOutcome {
            action,
            success,
            all_succeeded,
            any_succeeded,
            status,
            devices,
            cancelled,
        }
    }
}

impl<C: Connector> std::fmt::Debug for FleetDispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
