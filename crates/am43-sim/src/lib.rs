//! Simulated AM43 actuators.
//!
//! [`SimConnector`] implements [`am43_link::Connector`] over in-process
//! [`SimulatedActuator`]s, so the control layer can be exercised without a
//! radio. Each device is described by a [`SimProfile`] (readings, PIN,
//! travel speed) and a [`FaultPlan`] (unreachable, silent, noisy, ...).
//!
//! ```rust
//! use am43_link::{Connector, RadioLink};
//! use am43_protocol::{Command, Notification};
//! use am43_sim::{SimConnector, SimProfile};
//! use std::time::Duration;
//!
//! let mut connector = SimConnector::new();
//! connector.add("02:4E:F0:E3:8A:2B", SimProfile::with_readings(80, 0, 10));
//!
//! let mut link = connector.connect(&"02:4E:F0:E3:8A:2B".into()).unwrap();
//! link.write(&Command::RequestLight.encode().unwrap()).unwrap();
//! let raw = link.wait_for_notification(Duration::from_millis(100)).unwrap().unwrap();
//! assert_eq!(Notification::from_bytes(&raw), Ok(Notification::Light(10)));
//! ```

mod actuator;
mod link;
mod profile;

pub use actuator::*;
pub use link::*;
pub use profile::*;
