//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when working with the AM43 protocol.
///
/// The framing variants (`BadHeader`, `FrameTooShort`, `LengthMismatch`,
/// `ChecksumMismatch`) describe a malformed notification. The BLE link is
/// noisy, so callers treat them as droppable rather than fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload does not fit in the one-byte length field.
    #[error("invalid payload: {len} bytes exceeds maximum of {max}")]
    InvalidPayload {
        /// Payload length supplied.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// First byte is not the frame header.
    #[error("bad frame header: expected 0x9A, got 0x{0:02X}")]
    BadHeader(u8),

    /// Frame is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Length byte claims more payload than was received.
    #[error("length mismatch: header declares {declared} payload bytes, only {available} received")]
    LengthMismatch {
        /// Payload length from the length byte.
        declared: usize,
        /// Payload bytes actually present.
        available: usize,
    },

    /// Checksum byte does not match the XOR of the frame.
    #[error("checksum mismatch: computed 0x{expected:02X}, frame carries 0x{actual:02X}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u8,
        /// Checksum byte carried by the frame.
        actual: u8,
    },

    /// A reading notification is too short to hold its value.
    #[error("notification 0x{opcode:02X} too short: value at offset {offset}, payload is {len} bytes")]
    ReadingTooShort {
        /// Notification opcode.
        opcode: u8,
        /// Offset of the value.
        offset: usize,
        /// Payload length received.
        len: usize,
    },

    /// A percentage outside 0-100.
    #[error("value {value} out of range for 0x{opcode:02X} (0-100)")]
    OutOfRange {
        /// Opcode the value belongs to.
        opcode: u8,
        /// Offending value.
        value: u8,
    },

    /// PIN outside 0-9999.
    #[error("invalid PIN {0}: must be 0-9999")]
    InvalidPin(u16),
}

impl ProtocolError {
    /// Whether this error describes a damaged frame on the wire, as opposed to
    /// a caller mistake while building a command.
    pub fn is_malformed_frame(&self) -> bool {
        !matches!(
            self,
            ProtocolError::InvalidPayload { .. } | ProtocolError::InvalidPin(_)
        )
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
