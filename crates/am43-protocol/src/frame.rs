//! Frame encoding/decoding utilities.
//!
//! ```text
//! +------+--------+-----+-------------------+-----+
//! | 0x9A | opcode | len | payload[0..len]   | xor |
//! +------+--------+-----+-------------------+-----+
//! ```
//!
//! The checksum is the XOR of the header, opcode, length and every payload
//! byte. Notifications usually arrive one frame per BLE notification, but a
//! transport may also hand over fragments; [`FrameAssembler`] covers that case.

use bytes::{Buf, BytesMut};

use crate::constants::*;
use crate::error::*;

/// A decoded frame: opcode plus payload. Checksum and length are implied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Opcode byte.
    pub opcode: u8,
    /// Payload bytes (0-255).
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame from its parts.
    pub fn new(opcode: u8, payload: impl Into<Vec<u8>>) -> Self {
        Frame {
            opcode,
            payload: payload.into(),
        }
    }

    /// Encode this frame to wire bytes.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_frame(self.opcode, &self.payload)
    }
}

/// Running XOR over `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Build the wire bytes for `opcode` and `payload`.
pub fn encode_frame(opcode: u8, payload: &[u8]) -> ProtocolResult<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::InvalidPayload {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut buf = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    buf.push(FRAME_HEADER);
    buf.push(opcode);
    buf.push(payload.len() as u8);
    buf.extend_from_slice(payload);
    buf.push(checksum(&buf));
    Ok(buf)
}

/// Parse one frame from `raw`.
///
/// The length byte is checked against the received size before the payload is
/// read, and bytes following the checksum are ignored. The checksum is
/// verified before the header byte, so a single damaged byte anywhere in a
/// frame (header and length included) reports `ChecksumMismatch`.
/// `BadHeader` is left for input that never was a frame.
pub fn decode_frame(raw: &[u8]) -> ProtocolResult<Frame> {
    if raw.len() < FRAME_OVERHEAD {
        return Err(match raw.first() {
            Some(&first) if first != FRAME_HEADER => ProtocolError::BadHeader(first),
            _ => ProtocolError::FrameTooShort {
                expected: FRAME_OVERHEAD,
                actual: raw.len(),
            },
        });
    }

    let opcode = raw[1];
    let declared = raw[2] as usize;
    let available = raw.len() - FRAME_OVERHEAD;

    if declared != available {
        if let Some(err) = damaged_length(raw) {
            return Err(err);
        }
    }
    if available < declared {
        return Err(ProtocolError::LengthMismatch {
            declared,
            available,
        });
    }

    let body_end = 3 + declared;
    let expected = checksum(&raw[..body_end]);
    let actual = raw[body_end];
    if expected != actual {
        return Err(ProtocolError::ChecksumMismatch { expected, actual });
    }

    if raw[0] != FRAME_HEADER {
        return Err(ProtocolError::BadHeader(raw[0]));
    }

    if raw.len() > body_end + 1 {
        log::trace!(
            "ignoring {} trailing bytes after frame 0x{:02X}",
            raw.len() - body_end - 1,
            opcode
        );
    }

    Ok(Frame {
        opcode,
        payload: raw[3..body_end].to_vec(),
    })
}

/// Detect a frame whose only damage is its length byte: the whole buffer
/// checksums correctly once the length byte is replaced by the received
/// payload size.
fn damaged_length(raw: &[u8]) -> Option<ProtocolError> {
    let available = raw.len() - FRAME_OVERHEAD;
    if available > MAX_PAYLOAD_LEN {
        return None;
    }
    let last = raw.len() - 1;
    let received = checksum(&raw[..last]);
    if received ^ raw[2] ^ available as u8 == raw[last] {
        Some(ProtocolError::ChecksumMismatch {
            expected: received,
            actual: raw[last],
        })
    } else {
        None
    }
}

/// Accumulates notification bytes and yields complete frames.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl FrameAssembler {
    /// Create a new assembler.
    pub fn new() -> Self {
        FrameAssembler {
            buffer: BytesMut::with_capacity(MAX_FRAME_LEN),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to take the next complete frame from the buffer.
    ///
    /// Returns `None` if more data is needed. A candidate frame that fails
    /// its checksum is consumed and reported as `Some(Err(..))`.
    pub fn next_frame(&mut self) -> Option<ProtocolResult<Frame>> {
        // Scan for the header byte, discarding any preceding garbage
        while !self.buffer.is_empty() && self.buffer[0] != FRAME_HEADER {
            self.buffer.advance(1);
        }

        if self.buffer.len() < 3 {
            return None;
        }

        let total = FRAME_OVERHEAD + self.buffer[2] as usize;
        if self.buffer.len() < total {
            return None;
        }

        let candidate = self.buffer.split_to(total);
        Some(decode_frame(&candidate))
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Format bytes as `9a 0d 01 ...` for TX/RX logs.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}
