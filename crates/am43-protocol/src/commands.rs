//! Commands that can be sent to the actuator.

use crate::constants::*;
use crate::error::*;
use crate::frame::encode_frame;
use crate::types::*;

/// Commands that can be sent to the actuator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Manual move: stop, or drive while setting a limit.
    MoveManual(ManualMove),

    /// Move to a target position.
    MoveAuto {
        /// 0 = fully open, 100 = fully closed.
        percent: u8,
    },

    /// Raw settings block (the reverse-direction toggle lives here).
    Settings {
        /// Six settings bytes.
        data: [u8; 6],
    },

    /// Authenticate with the device PIN.
    Login {
        /// Decimal PIN, 0-9999.
        pin: u16,
    },

    /// Set or save a travel limit.
    SetLimits {
        /// Set or save.
        mode: LimitMode,
        /// Upper or lower limit.
        channel: LimitChannel,
    },

    /// Ask for the battery reading.
    RequestBattery,

    /// Ask for the ambient light reading.
    RequestLight,

    /// Ask for the position reading.
    RequestPosition,

    /// Acknowledge the position burst (`a7 5a`).
    AcknowledgePosition,
}

impl Command {
    /// Open the blind fully.
    pub fn open() -> Self {
        Command::MoveAuto {
            percent: POSITION_OPEN,
        }
    }

    /// Close the blind fully.
    pub fn close() -> Self {
        Command::MoveAuto {
            percent: POSITION_CLOSED,
        }
    }

    /// Stop any motion.
    pub fn stop() -> Self {
        Command::MoveManual(ManualMove::Stop)
    }

    /// Opcode byte for this command.
    pub fn opcode(&self) -> u8 {
        match self {
            Command::MoveManual(_) => ID_MOVE_MANUAL,
            Command::MoveAuto { .. } => ID_MOVE_AUTO,
            Command::Settings { .. } => ID_SETTINGS,
            Command::Login { .. } => ID_LOGIN,
            Command::SetLimits { .. } => ID_SET_LIMITS,
            Command::RequestBattery => ID_BATTERY,
            Command::RequestLight => ID_LIGHT,
            Command::RequestPosition | Command::AcknowledgePosition => ID_POSITION,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::MoveManual(ManualMove::Stop) => "MoveManual(stop)",
            Command::MoveManual(ManualMove::SetUpper) => "MoveManual(set-upper)",
            Command::MoveManual(ManualMove::SetLower) => "MoveManual(set-lower)",
            Command::MoveAuto { .. } => "MoveAuto",
            Command::Settings { .. } => "Settings",
            Command::Login { .. } => "Login",
            Command::SetLimits { .. } => "SetLimits",
            Command::RequestBattery => "RequestBattery",
            Command::RequestLight => "RequestLight",
            Command::RequestPosition => "RequestPosition",
            Command::AcknowledgePosition => "AcknowledgePosition",
        }
    }

    /// Payload bytes for this command, validating arguments.
    pub fn payload(&self) -> ProtocolResult<Vec<u8>> {
        let payload = match self {
            Command::MoveManual(kind) => vec![u8::from(*kind)],

            Command::MoveAuto { percent } => {
                if *percent > POSITION_CLOSED {
                    return Err(ProtocolError::OutOfRange {
                        opcode: ID_MOVE_AUTO,
                        value: *percent,
                    });
                }
                vec![*percent]
            }

            Command::Settings { data } => data.to_vec(),

            Command::Login { pin } => encode_pin(*pin)?.to_vec(),

            Command::SetLimits { mode, channel } => {
                vec![u8::from(*mode), u8::from(*channel), 0x00]
            }

            Command::RequestBattery | Command::RequestLight | Command::RequestPosition => {
                vec![STATUS_REQUEST_BYTE]
            }

            Command::AcknowledgePosition => vec![ACK_OK],
        };
        Ok(payload)
    }

    /// Encode this command as a complete frame.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_frame(self.opcode(), &self.payload()?)
    }
}

/// Encode a decimal PIN the way the actuator expects it: the PIN value as a
/// big-endian 16-bit integer (8888 → `22 b8`).
pub fn encode_pin(pin: u16) -> ProtocolResult<[u8; 2]> {
    if pin > MAX_PIN {
        return Err(ProtocolError::InvalidPin(pin));
    }
    Ok(pin.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::decode_frame;

    #[test]
    fn test_action_commands() {
        assert_eq!(Command::open().encode().unwrap()[..4], [0x9A, 0x0D, 0x01, 0x00]);
        assert_eq!(Command::close().encode().unwrap()[..4], [0x9A, 0x0D, 0x01, 0x64]);
        assert_eq!(Command::stop().encode().unwrap()[..4], [0x9A, 0x0A, 0x01, 0xCC]);
    }

    #[test]
    fn test_move_auto_rejects_over_100() {
        assert_eq!(
            Command::MoveAuto { percent: 101 }.encode(),
            Err(ProtocolError::OutOfRange {
                opcode: ID_MOVE_AUTO,
                value: 101
            })
        );
    }

    #[test]
    fn test_login_pin_encoding() {
        assert_eq!(encode_pin(8888).unwrap(), [0x22, 0xB8]);
        assert_eq!(encode_pin(0).unwrap(), [0x00, 0x00]);
        assert_eq!(encode_pin(10000), Err(ProtocolError::InvalidPin(10000)));

        let frame = decode_frame(&Command::Login { pin: DEFAULT_PIN }.encode().unwrap()).unwrap();
        assert_eq!(frame.opcode, ID_LOGIN);
        assert_eq!(frame.payload, vec![0x22, 0xB8]);
    }

    #[test]
    fn test_set_limits_payload() {
        let cmd = Command::SetLimits {
            mode: LimitMode::Save,
            channel: LimitChannel::Lower,
        };
        assert_eq!(cmd.payload().unwrap(), vec![0x20, 0x02, 0x00]);
    }

    #[test]
    fn test_status_requests_share_reading_opcodes() {
        assert_eq!(Command::RequestBattery.opcode(), ID_BATTERY);
        assert_eq!(Command::RequestLight.opcode(), ID_LIGHT);
        assert_eq!(Command::RequestPosition.opcode(), ID_POSITION);
        assert_eq!(Command::AcknowledgePosition.payload().unwrap(), vec![ACK_OK]);
    }
}
