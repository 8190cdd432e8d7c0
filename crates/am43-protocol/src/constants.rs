//! Protocol constants
//!
//! These constants define the frame header, opcodes, acknowledgement bytes and
//! other protocol-specific values used by AM43 actuators.

// ============================================================================
// Framing
// ============================================================================

/// First byte of every frame, in both directions.
pub const FRAME_HEADER: u8 = 0x9A;
/// Header + opcode + length + checksum.
pub const FRAME_OVERHEAD: usize = 4;
/// Largest payload expressible in the one-byte length field.
pub const MAX_PAYLOAD_LEN: usize = 255;
/// Largest complete frame.
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + FRAME_OVERHEAD;

// ============================================================================
// Command Opcodes (host → actuator)
// ============================================================================

/// Manual move. 1-byte payload: stop, set-upper or set-lower.
pub const ID_MOVE_MANUAL: u8 = 0x0A;
/// Move to a target percentage. 1-byte payload, 0 = open, 100 = closed.
pub const ID_MOVE_AUTO: u8 = 0x0D;
/// Settings block (e.g. reverse direction). 6-byte payload.
pub const ID_SETTINGS: u8 = 0x11;
/// Login with the device PIN. 2-byte payload (8888 == 22 b8).
pub const ID_LOGIN: u8 = 0x17;
/// Set or save a travel limit. 3-byte payload: `<set/save> <channel> 00`.
pub const ID_SET_LIMITS: u8 = 0x22;

// ============================================================================
// Notification Opcodes (actuator → host)
// ============================================================================

/// Travel limits. 4 bytes, e.g. `00 64 00 00`.
pub const ID_LIMITS: u8 = 0xA1;
/// Battery reading. Percentage at payload offset 7. Also the request opcode.
pub const ID_BATTERY: u8 = 0xA2;
/// Position reading. 7 bytes `0e 32 00 00 00 <pos> 30`, percentage at payload
/// offset 5.
/// Also the request opcode.
pub const ID_POSITION: u8 = 0xA7;
/// Position confirmation. No payload.
pub const ID_POSITION_CONFIRM: u8 = 0xA8;
/// Extended position/orientation info. 10 bytes, layout unknown.
pub const ID_POSITION_EXTENDED: u8 = 0xA9;
/// Ambient light reading. Level at payload offset 3. Also the request opcode.
pub const ID_LIGHT: u8 = 0xAA;

/// Payload offset of the battery percentage in an [`ID_BATTERY`] notification.
pub const BATTERY_OFFSET: usize = 7;
/// Payload offset of the position percentage in an [`ID_POSITION`] notification.
pub const POSITION_OFFSET: usize = 5;
/// Payload offset of the light level in an [`ID_LIGHT`] notification.
pub const LIGHT_OFFSET: usize = 3;
/// Payload length of an [`ID_LIMITS`] notification.
pub const LIMITS_LEN: usize = 4;

// ============================================================================
// Acknowledgement Codes
// ============================================================================

/// Command accepted.
pub const ACK_OK: u8 = 0x5A;
/// Settings change accepted and stored.
pub const ACK_SET: u8 = 0x5B;
/// Command rejected.
pub const ACK_ERR: u8 = 0xA5;

// ============================================================================
// Payload Values
// ============================================================================

/// Manual move: stop.
pub const MANUAL_STOP: u8 = 0xCC;
/// Manual move: drive towards the upper limit while setting it.
pub const MANUAL_SET_UPPER: u8 = 0xDD;
/// Manual move: drive towards the lower limit while setting it.
pub const MANUAL_SET_LOWER: u8 = 0xEE;

/// Limit mode byte: begin setting a limit.
pub const LIMIT_MODE_SET: u8 = 0x00;
/// Limit mode byte: save the current position as the limit.
pub const LIMIT_MODE_SAVE: u8 = 0x20;
/// Limit channel: upper.
pub const LIMIT_CHANNEL_UPPER: u8 = 0x01;
/// Limit channel: lower.
pub const LIMIT_CHANNEL_LOWER: u8 = 0x02;

/// Payload byte for status requests. The actuator ignores its value.
pub const STATUS_REQUEST_BYTE: u8 = 0x01;

/// Fully open target for [`ID_MOVE_AUTO`].
pub const POSITION_OPEN: u8 = 0;
/// Fully closed target for [`ID_MOVE_AUTO`].
pub const POSITION_CLOSED: u8 = 100;

/// Factory default PIN.
pub const DEFAULT_PIN: u16 = 8888;
/// Largest PIN the actuator accepts.
pub const MAX_PIN: u16 = 9999;

// ============================================================================
// GATT
// ============================================================================

/// Service UUID (16-bit short form) carrying the command characteristic.
pub const SERVICE_UUID_SHORT: u16 = 0xFE50;
/// Write/notify characteristic UUID (16-bit short form).
pub const CHARACTERISTIC_UUID_SHORT: u16 = 0xFE51;
