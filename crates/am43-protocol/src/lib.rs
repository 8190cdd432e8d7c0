//! AM43 Blind Actuator Protocol
//!
//! This crate provides types and utilities for talking to AM43-style motorized
//! blind actuators over their BLE write/notify characteristic pair. Every
//! message in both directions uses the same framing:
//!
//! ```text
//! +------+--------+-----+-------------------+-----+
//! | 0x9A | opcode | len | payload[0..len]   | xor |
//! +------+--------+-----+-------------------+-----+
//! ```
//!
//! The trailing byte is the running XOR of every preceding byte.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → actuator): move, login, settings, limits and status
//!   requests, built with [`Command`]
//! - **Notifications** (actuator → host): acknowledgements and readings
//!   (battery, position, light, limits), decoded into [`Notification`]
//!
//! # Example
//!
//! ```rust
//! use am43_protocol::{Command, Notification, decode_frame};
//!
//! let frame = Command::MoveAuto { percent: 100 }.encode().unwrap();
//! assert_eq!(frame[0], 0x9A);
//!
//! let reply = decode_frame(&[0x9A, 0xAA, 0x04, 0, 0, 0, 77, 0x9A ^ 0xAA ^ 0x04 ^ 77]).unwrap();
//! assert_eq!(Notification::decode(&reply).unwrap(), Notification::Light(77));
//! ```

mod commands;
mod constants;
mod error;
mod frame;
mod notifications;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use notifications::*;
pub use types::*;
