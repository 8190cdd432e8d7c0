//! Control layer for AM43 blind actuators.
//!
//! - [`ActuatorSession`]: command/response exchange with one connected device
//! - [`RetryPolicy`]: bounded connection retry with a typed outcome
//! - [`FleetDispatcher`]: runs an action across every configured device
//! - [`CancelToken`]: aborts a fleet action from another thread
//!
//! The radio itself is abstracted by [`am43_link::Connector`]; this crate
//! never scans, pairs or discovers characteristics.
//!
//! # Example
//!
//! ```rust,ignore
//! use am43_control::{CancelToken, FleetConfig, FleetDispatcher};
//!
//! let config: FleetConfig = serde_yaml::from_str(&std::fs::read_to_string("am43.yaml")?)?;
//! let mut fleet = FleetDispatcher::new(connector, config)?;
//! let outcome = fleet.perform_action("Close", &CancelToken::new());
//! println!("{} {}", outcome.success, outcome.status);
//! ```

mod action;
mod cancel;
mod config;
mod fleet;
mod retry;
mod session;

pub use action::*;
pub use cancel::*;
pub use config::*;
pub use fleet::*;
pub use retry::*;
pub use session::*;
