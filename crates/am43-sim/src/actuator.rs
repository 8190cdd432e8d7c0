//! Simulated AM43 actuator.
//!
//! Consumes command frames the way the motor controller does and produces
//! the notification frames it would send back. Motion is modelled as a
//! target position that the blind travels towards on each position request.

use am43_protocol::*;
use tracing::{debug, trace, warn};

use crate::profile::SimProfile;

/// Extended position block sent after every position reading.
const EXTENDED_POSITION: [u8; 10] = [0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// A simulated actuator.
#[derive(Debug)]
pub struct SimulatedActuator {
    battery: u8,
    position: u8,
    target: u8,
    light: u8,
    limits: [u8; LIMITS_LEN],
    settings: [u8; 6],
    pin: u16,
    require_login: bool,
    logged_in: bool,
    travel_per_poll: u8,

    assembler: FrameAssembler,
    history: Vec<Frame>,
}

impl SimulatedActuator {
    /// Create an actuator from a profile.
    pub fn new(profile: &SimProfile) -> Self {
        SimulatedActuator {
            battery: profile.battery,
            position: profile.position,
            target: profile.position,
            light: profile.light,
            limits: [0x00, POSITION_CLOSED, 0x00, 0x00],
            settings: [0; 6],
            pin: profile.pin,
            require_login: profile.require_login,
            logged_in: false,
            travel_per_poll: profile.travel_per_poll,
            assembler: FrameAssembler::new(),
            history: Vec::new(),
        }
    }

    /// Current position.
    pub fn position(&self) -> u8 {
        self.position
    }

    /// Position the blind is travelling to.
    pub fn target(&self) -> u8 {
        self.target
    }

    /// Battery reading.
    pub fn battery(&self) -> u8 {
        self.battery
    }

    /// Light reading.
    pub fn light(&self) -> u8 {
        self.light
    }

    /// Stored travel limits.
    pub fn limits(&self) -> [u8; LIMITS_LEN] {
        self.limits
    }

    /// Last settings block written.
    pub fn settings(&self) -> [u8; 6] {
        self.settings
    }

    /// Whether a login succeeded on this connection.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Every valid frame received, in order.
    pub fn history(&self) -> &[Frame] {
        &self.history
    }

    /// Change the battery reading.
    pub fn set_battery(&mut self, percent: u8) {
        self.battery = percent.min(100);
    }

    /// Change the light reading.
    pub fn set_light(&mut self, level: u8) {
        self.light = level.min(100);
    }

    /// Finish any motion in progress.
    pub fn settle(&mut self) {
        self.position = self.target;
    }

    /// Forget per-connection state.
    pub fn reset_connection(&mut self) {
        self.logged_in = false;
        self.assembler.clear();
    }

    /// Feed written bytes to the actuator and collect its notifications as
    /// wire frames.
    ///
    /// A write may carry part of a frame or several frames. Frames that fail
    /// to decode are ignored, as the hardware does.
    pub fn receive(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.assembler.push(bytes);

        let mut replies = Vec::new();
        while let Some(result) = self.assembler.next_frame() {
            match result {
                Ok(frame) => {
                    for reply in self.handle(&frame) {
                        match reply.encode() {
                            Ok(bytes) => replies.push(bytes),
                            Err(e) => warn!(error = %e, "cannot encode simulated reply"),
                        }
                    }
                    self.history.push(frame);
                }
                Err(e) => debug!(error = %e, "actuator ignoring malformed command"),
            }
        }
        replies
    }

    /// Handle one command frame.
    fn handle(&mut self, frame: &Frame) -> Vec<Frame> {
        let opcode = frame.opcode;
        let payload = frame.payload.as_slice();
        trace!(opcode = format_args!("0x{:02X}", opcode), len = payload.len(), "command");

        if self.require_login && !self.logged_in && requires_login(opcode) {
            debug!(opcode = format_args!("0x{:02X}", opcode), "command before login");
            return vec![ack(opcode, AckCode::Error)];
        }

        match (opcode, payload) {
            (ID_LOGIN, [hi, lo]) => {
                let pin = u16::from_be_bytes([*hi, *lo]);
                self.logged_in = pin == self.pin;
                let code = if self.logged_in {
                    AckCode::Ok
                } else {
                    AckCode::Error
                };
                vec![ack(opcode, code)]
            }

            (ID_MOVE_AUTO, [percent]) if *percent <= POSITION_CLOSED => {
                self.target = *percent;
                vec![ack(opcode, AckCode::Ok)]
            }

            (ID_MOVE_MANUAL, [MANUAL_STOP]) => {
                self.target = self.position;
                vec![ack(opcode, AckCode::Ok)]
            }

            (ID_MOVE_MANUAL, [MANUAL_SET_UPPER]) => {
                self.target = POSITION_OPEN;
                vec![ack(opcode, AckCode::Ok)]
            }

            (ID_MOVE_MANUAL, [MANUAL_SET_LOWER]) => {
                self.target = POSITION_CLOSED;
                vec![ack(opcode, AckCode::Ok)]
            }

            (ID_SETTINGS, data) if data.len() == 6 => {
                self.settings.copy_from_slice(data);
                vec![ack(opcode, AckCode::Ok)]
            }

            (ID_SET_LIMITS, [LIMIT_MODE_SET, LIMIT_CHANNEL_UPPER | LIMIT_CHANNEL_LOWER, 0x00]) => {
                vec![ack(opcode, AckCode::Ok)]
            }

            (ID_SET_LIMITS, [LIMIT_MODE_SAVE, channel @ (LIMIT_CHANNEL_UPPER | LIMIT_CHANNEL_LOWER), 0x00]) => {
                let index = if *channel == LIMIT_CHANNEL_UPPER { 0 } else { 1 };
                self.limits[index] = self.position;
                vec![
                    ack(opcode, AckCode::SetAcknowledged),
                    Frame::new(ID_LIMITS, self.limits.to_vec()),
                ]
            }

            (ID_BATTERY, [_]) => {
                let mut data = vec![0u8; BATTERY_OFFSET + 1];
                data[BATTERY_OFFSET] = self.battery;
                vec![Frame::new(ID_BATTERY, data)]
            }

            (ID_LIGHT, [_]) => {
                let mut data = vec![0u8; LIGHT_OFFSET + 1];
                data[LIGHT_OFFSET] = self.light;
                vec![Frame::new(ID_LIGHT, data)]
            }

            // Host acknowledging the position burst
            (ID_POSITION, [ACK_OK]) => Vec::new(),

            (ID_POSITION, [_]) => {
                self.travel();
                let mut data = vec![0x0E, 0x32, 0x00, 0x00, 0x00, 0x00, 0x30];
                data[POSITION_OFFSET] = self.position;
                vec![
                    Frame::new(ID_POSITION, data),
                    Frame::new(ID_POSITION_CONFIRM, Vec::new()),
                    Frame::new(ID_POSITION_EXTENDED, EXTENDED_POSITION.to_vec()),
                ]
            }

            _ => {
                debug!(opcode = format_args!("0x{:02X}", opcode), "unsupported command");
                vec![ack(opcode, AckCode::Error)]
            }
        }
    }

    fn travel(&mut self) {
        let step = self.travel_per_poll;
        if self.position < self.target {
            self.position = self.position.saturating_add(step).min(self.target);
        } else {
            self.position = self.position.saturating_sub(step).max(self.target);
        }
    }
}

fn ack(opcode: u8, code: AckCode) -> Frame {
    Frame::new(opcode, vec![u8::from(code)])
}

fn requires_login(opcode: u8) -> bool {
    matches!(
        opcode,
        ID_MOVE_MANUAL | ID_MOVE_AUTO | ID_SETTINGS | ID_SET_LIMITS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(actuator: &mut SimulatedActuator, command: Command) -> Vec<Notification> {
        actuator
            .receive(&command.encode().unwrap())
            .iter()
            .map(|raw| Notification::from_bytes(raw).unwrap())
            .collect()
    }

    #[test]
    fn test_status_readings() {
        let mut actuator = SimulatedActuator::new(&SimProfile::with_readings(80, 0, 10));
        assert_eq!(send(&mut actuator, Command::RequestBattery), vec![Notification::Battery(80)]);
        assert_eq!(send(&mut actuator, Command::RequestLight), vec![Notification::Light(10)]);

        let burst = send(&mut actuator, Command::RequestPosition);
        assert_eq!(burst[0], Notification::Position(0));
        assert_eq!(burst[1], Notification::PositionConfirmed);
        assert_eq!(burst[2].kind(), "position-extended");

        assert!(send(&mut actuator, Command::AcknowledgePosition).is_empty());
    }

    #[test]
    fn test_move_and_travel() {
        let profile = SimProfile::default().with_travel_per_poll(60);
        let mut actuator = SimulatedActuator::new(&profile);

        let reply = send(&mut actuator, Command::close());
        assert_eq!(reply[0].ack_code(), Some(AckCode::Ok));
        assert_eq!(actuator.target(), 100);
        assert_eq!(actuator.position(), 0);

        assert_eq!(send(&mut actuator, Command::RequestPosition)[0], Notification::Position(60));
        assert_eq!(send(&mut actuator, Command::RequestPosition)[0], Notification::Position(100));

        send(&mut actuator, Command::open());
        send(&mut actuator, Command::stop());
        assert_eq!(actuator.target(), 100);
    }

    #[test]
    fn test_login_gate() {
        let profile = SimProfile::default().with_required_login(1234);
        let mut actuator = SimulatedActuator::new(&profile);

        let reply = send(&mut actuator, Command::open());
        assert_eq!(reply[0].ack_code(), Some(AckCode::Error));

        let reply = send(&mut actuator, Command::Login { pin: 8888 });
        assert_eq!(reply[0].ack_code(), Some(AckCode::Error));
        assert!(!actuator.is_logged_in());

        let reply = send(&mut actuator, Command::Login { pin: 1234 });
        assert_eq!(reply[0].ack_code(), Some(AckCode::Ok));
        assert_eq!(send(&mut actuator, Command::open())[0].ack_code(), Some(AckCode::Ok));
    }

    #[test]
    fn test_save_limit_acknowledges_set() {
        let mut actuator = SimulatedActuator::new(&SimProfile::default());
        let set = Command::SetLimits {
            mode: LimitMode::Set,
            channel: LimitChannel::Upper,
        };
        assert_eq!(send(&mut actuator, set)[0].ack_code(), Some(AckCode::Ok));

        let save = Command::SetLimits {
            mode: LimitMode::Save,
            channel: LimitChannel::Upper,
        };
        let reply = send(&mut actuator, save);
        assert_eq!(reply[0].ack_code(), Some(AckCode::SetAcknowledged));
        assert!(matches!(reply[1], Notification::Limits(_)));
    }

    #[test]
    fn test_fragmented_and_concatenated_writes() {
        let mut actuator = SimulatedActuator::new(&SimProfile::default());
        let frame = Command::RequestBattery.encode().unwrap();
        assert!(actuator.receive(&frame[..2]).is_empty());
        assert_eq!(actuator.receive(&frame[2..]).len(), 1);

        let mut both = Command::RequestLight.encode().unwrap();
        both.extend(Command::stop().encode().unwrap());
        assert_eq!(actuator.receive(&both).len(), 2);
        assert_eq!(actuator.history().len(), 3);
    }

    #[test]
    fn test_corrupted_command_is_ignored() {
        let mut actuator = SimulatedActuator::new(&SimProfile::default());
        let mut frame = Command::close().encode().unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0x55;
        assert!(actuator.receive(&frame).is_empty());
        assert_eq!(actuator.target(), 0);
        assert!(actuator.history().is_empty());
    }

    #[test]
    fn test_unsupported_command_gets_error_ack() {
        let mut actuator = SimulatedActuator::new(&SimProfile::default());
        let raw = encode_frame(0x14, &[0x05, 0x07, 0x34, 0x39]).unwrap();
        let reply = actuator.receive(&raw);
        assert_eq!(
            Notification::from_bytes(&reply[0]).unwrap(),
            Notification::Ack {
                opcode: 0x14,
                code: AckCode::Error
            }
        );
    }
}
