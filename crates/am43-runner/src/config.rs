//! Runner configuration file.
//!
//! The fleet sections (`devices`, `session`, `retry`) are read straight into
//! [`FleetConfig`]. An optional `simulator` map gives the simulated actuator
//! behind each configured device name; devices without an entry get the
//! default profile.
//!
//! ```yaml
//! devices:
//!   - name: living_room
//!     address: "02:4E:F0:E3:8A:2B"
//! simulator:
//!   living_room:
//!     battery: 80
//!     light: 10
//! ```

use am43_control::FleetConfig;
use am43_sim::{SimConnector, SimProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "am43.yaml";

/// Everything read from the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Devices, session settings and retry policy.
    #[serde(flatten)]
    pub fleet: FleetConfig,

    /// Simulated actuator per device name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub simulator: BTreeMap<String, SimProfile>,
}

impl RunnerConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> RunnerResult<Self> {
        let config: RunnerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> RunnerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration");
        Self::from_yaml(&text)
    }

    /// Check the fleet settings and that every simulator entry names a
    /// configured device.
    pub fn validate(&self) -> RunnerResult<()> {
        self.fleet.validate()?;
        for name in self.simulator.keys() {
            if !self.fleet.devices.iter().any(|d| &d.name == name) {
                return Err(RunnerError::UnknownSimulatedDevice(name.clone()));
            }
        }
        Ok(())
    }

    /// Build a simulated connector with one actuator per configured device.
    pub fn build_simulator(&self) -> SimConnector {
        let mut connector = SimConnector::new();
        for device in &self.fleet.devices {
            let profile = self.simulator.get(&device.name).cloned().unwrap_or_default();
            connector.add(device.address.clone(), profile);
        }
        connector
    }
}
