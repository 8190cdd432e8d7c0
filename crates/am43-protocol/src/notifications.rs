//! Notifications received from the actuator.

use crate::constants::*;
use crate::error::*;
use crate::frame::{decode_frame, Frame};
use crate::types::*;

/// A decoded notification.
///
/// Opcodes outside the known set decode to [`Notification::Unrecognized`]
/// instead of failing, so newer firmware does not break older hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Protocol acknowledgement for a command.
    Ack {
        /// Opcode of the acknowledged command.
        opcode: u8,
        /// Result code.
        code: AckCode,
    },

    /// Battery charge, 0-100 %.
    Battery(u8),

    /// Blind position, 0 % open to 100 % closed.
    Position(u8),

    /// Ambient light level, 0-100.
    Light(u8),

    /// Travel limits, raw.
    Limits([u8; LIMITS_LEN]),

    /// Position confirmation (no data).
    PositionConfirmed,

    /// Extended position/orientation block, raw.
    ExtendedPosition(Vec<u8>),

    /// Any opcode this crate does not know.
    Unrecognized {
        /// Opcode byte.
        opcode: u8,
        /// Raw payload.
        payload: Vec<u8>,
    },
}

impl Notification {
    /// Decode a notification from a parsed frame.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let opcode = frame.opcode;
        let payload = frame.payload.as_slice();

        // One-byte ack payloads can follow any command opcode
        if let [byte] = payload {
            if let Some(code) = AckCode::from_byte(*byte) {
                return Ok(Notification::Ack { opcode, code });
            }
        }

        match opcode {
            ID_BATTERY => Ok(Notification::Battery(percent_at(opcode, payload, BATTERY_OFFSET)?)),

            ID_POSITION => Ok(Notification::Position(percent_at(opcode, payload, POSITION_OFFSET)?)),

            ID_LIGHT => Ok(Notification::Light(percent_at(opcode, payload, LIGHT_OFFSET)?)),

            ID_LIMITS => {
                if payload.len() < LIMITS_LEN {
                    return Err(ProtocolError::ReadingTooShort {
                        opcode,
                        offset: LIMITS_LEN - 1,
                        len: payload.len(),
                    });
                }
                let mut limits = [0u8; LIMITS_LEN];
                limits.copy_from_slice(&payload[..LIMITS_LEN]);
                Ok(Notification::Limits(limits))
            }

            ID_POSITION_CONFIRM => Ok(Notification::PositionConfirmed),

            ID_POSITION_EXTENDED => Ok(Notification::ExtendedPosition(payload.to_vec())),

            _ => {
                log::debug!(
                    "unrecognized notification 0x{:02X} ({} bytes)",
                    opcode,
                    payload.len()
                );
                Ok(Notification::Unrecognized {
                    opcode,
                    payload: payload.to_vec(),
                })
            }
        }
    }

    /// Decode a notification straight from wire bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ProtocolError> {
        Self::decode(&decode_frame(raw)?)
    }

    /// Stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Ack { .. } => "ack",
            Notification::Battery(_) => "battery",
            Notification::Position(_) => "position",
            Notification::Light(_) => "light",
            Notification::Limits(_) => "limits",
            Notification::PositionConfirmed => "position-confirmed",
            Notification::ExtendedPosition(_) => "position-extended",
            Notification::Unrecognized { .. } => "unrecognized",
        }
    }

    /// The ack code, if this is an acknowledgement.
    pub fn ack_code(&self) -> Option<AckCode> {
        match self {
            Notification::Ack { code, .. } => Some(*code),
            _ => None,
        }
    }
}

fn percent_at(opcode: u8, payload: &[u8], offset: usize) -> Result<u8, ProtocolError> {
    let value = *payload.get(offset).ok_or(ProtocolError::ReadingTooShort {
        opcode,
        offset,
        len: payload.len(),
    })?;
    if value > 100 {
        return Err(ProtocolError::OutOfRange { opcode, value });
    }
    Ok(value)
}
