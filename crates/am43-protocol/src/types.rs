//! Common types used in the protocol.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::notifications::Notification;

/// Protocol-level result of a command, carried in a one-byte notification
/// payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckCode {
    /// Command accepted.
    Ok,
    /// Settings change accepted and stored.
    SetAcknowledged,
    /// Command rejected.
    Error,
}

impl AckCode {
    /// Map an ack byte to its code, if it is one.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ACK_OK => Some(AckCode::Ok),
            ACK_SET => Some(AckCode::SetAcknowledged),
            ACK_ERR => Some(AckCode::Error),
            _ => None,
        }
    }

    /// Whether the actuator accepted the command.
    pub fn is_accepted(self) -> bool {
        !matches!(self, AckCode::Error)
    }
}

impl From<AckCode> for u8 {
    fn from(code: AckCode) -> Self {
        match code {
            AckCode::Ok => ACK_OK,
            AckCode::SetAcknowledged => ACK_SET,
            AckCode::Error => ACK_ERR,
        }
    }
}

impl std::fmt::Display for AckCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AckCode::Ok => write!(f, "OK"),
            AckCode::SetAcknowledged => write!(f, "SET"),
            AckCode::Error => write!(f, "ERR"),
        }
    }
}

/// Payload of a manual move command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualMove {
    /// Stop any motion.
    Stop,
    /// Drive up while setting the upper limit.
    SetUpper,
    /// Drive down while setting the lower limit.
    SetLower,
}

impl From<ManualMove> for u8 {
    fn from(value: ManualMove) -> Self {
        match value {
            ManualMove::Stop => MANUAL_STOP,
            ManualMove::SetUpper => MANUAL_SET_UPPER,
            ManualMove::SetLower => MANUAL_SET_LOWER,
        }
    }
}

/// First byte of a set-limits command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitMode {
    /// Begin setting a limit.
    Set,
    /// Save the current position as the limit.
    Save,
}

impl From<LimitMode> for u8 {
    fn from(value: LimitMode) -> Self {
        match value {
            LimitMode::Set => LIMIT_MODE_SET,
            LimitMode::Save => LIMIT_MODE_SAVE,
        }
    }
}

/// Which travel limit a set-limits command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitChannel {
    /// Upper (open) limit.
    Upper,
    /// Lower (closed) limit.
    Lower,
}

impl From<LimitChannel> for u8 {
    fn from(value: LimitChannel) -> Self {
        match value {
            LimitChannel::Upper => LIMIT_CHANNEL_UPPER,
            LimitChannel::Lower => LIMIT_CHANNEL_LOWER,
        }
    }
}

/// Last known readings of one actuator, or of a fleet.
///
/// `None` means the reading was never observed. Fields only change when the
/// matching notification arrives, so an older value stays in place until it
/// is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Battery charge, 0-100 %.
    pub battery: Option<u8>,
    /// Blind position, 0 % open to 100 % closed.
    pub position: Option<u8>,
    /// Ambient light level, 0-100.
    pub light: Option<u8>,
}

impl DeviceStatus {
    /// Status with every reading unknown.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Fold a notification into the status. Returns `true` if it carried a
    /// reading.
    pub fn apply(&mut self, notification: &Notification) -> bool {
        match notification {
            Notification::Battery(v) => self.battery = Some(*v),
            Notification::Position(v) => self.position = Some(*v),
            Notification::Light(v) => self.light = Some(*v),
            _ => return false,
        }
        true
    }

    /// Overwrite the fields that `other` knows. Unknown fields in `other`
    /// leave ours untouched.
    pub fn merge(&mut self, other: &DeviceStatus) {
        if other.battery.is_some() {
            self.battery = other.battery;
        }
        if other.position.is_some() {
            self.position = other.position;
        }
        if other.light.is_some() {
            self.light = other.light;
        }
    }

    /// Whether all three readings are known.
    pub fn is_complete(&self) -> bool {
        self.battery.is_some() && self.position.is_some() && self.light.is_some()
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn show(v: Option<u8>) -> String {
            v.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
        }
        write!(
            f,
            "battery={}% position={}% light={}%",
            show(self.battery),
            show(self.position),
            show(self.light)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_code_bytes() {
        assert_eq!(AckCode::from_byte(0x5A), Some(AckCode::Ok));
        assert_eq!(AckCode::from_byte(0x5B), Some(AckCode::SetAcknowledged));
        assert_eq!(AckCode::from_byte(0xA5), Some(AckCode::Error));
        assert_eq!(AckCode::from_byte(0x00), None);
        assert_eq!(u8::from(AckCode::Error), 0xA5);
        assert!(!AckCode::Error.is_accepted());
        assert!(AckCode::SetAcknowledged.is_accepted());
    }

    #[test]
    fn test_status_apply_only_readings() {
        let mut status = DeviceStatus::unknown();
        assert!(status.apply(&Notification::Battery(42)));
        assert!(!status.apply(&Notification::PositionConfirmed));
        assert_eq!(status.battery, Some(42));
        assert_eq!(status.position, None);
    }

    #[test]
    fn test_status_merge_keeps_stale_values() {
        let mut aggregate = DeviceStatus {
            battery: Some(90),
            position: Some(10),
            light: Some(5),
        };
        let partial = DeviceStatus {
            battery: Some(60),
            position: None,
            light: None,
        };
        aggregate.merge(&partial);
        assert_eq!(aggregate.battery, Some(60));
        assert_eq!(aggregate.position, Some(10));
        assert_eq!(aggregate.light, Some(5));
    }

    #[test]
    fn test_status_display() {
        let status = DeviceStatus {
            battery: Some(80),
            position: None,
            light: Some(10),
        };
        assert_eq!(status.to_string(), "battery=80% position=?% light=10%");
    }
}
