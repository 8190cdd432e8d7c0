//! Simulated connector and link.
//!
//! Each registered address owns a [`SimulatedActuator`]. Connecting returns a
//! [`SimLink`]; writes are fed to the actuator and its replies are queued on
//! a channel that [`RadioLink::wait_for_notification`] drains.

use am43_link::{Connector, DeviceAddress, LinkError, LinkResult, RadioLink, WriteAck};
use am43_protocol::Frame;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::actuator::SimulatedActuator;
use crate::profile::{FaultPlan, SimProfile};

#[derive(Debug)]
struct SimDevice {
    actuator: SimulatedActuator,
    faults: FaultPlan,
    rng: ChaCha8Rng,
    connect_times: Vec<Instant>,
    disconnects: u32,
    connected: bool,
    replies_sent: u32,
}

impl SimDevice {
    /// Whether the next reply should be preceded by a corrupted copy.
    fn next_reply_is_noisy(&mut self) -> bool {
        let scripted = self.replies_sent < self.faults.noisy_replies;
        let random = self.faults.noise > 0.0 && self.rng.gen_bool(self.faults.noise.min(1.0));
        self.replies_sent += 1;
        scripted || random
    }

    fn corrupt(&mut self, frame: &[u8]) -> Vec<u8> {
        let mut noisy = frame.to_vec();
        if !noisy.is_empty() {
            let index = self.rng.gen_range(0..noisy.len());
            noisy[index] ^= 1u8 << self.rng.gen_range(0..8u32);
        }
        noisy
    }
}

/// Shared handle for inspecting a simulated device from tests.
#[derive(Debug, Clone)]
pub struct SimHandle {
    address: DeviceAddress,
    device: Arc<Mutex<SimDevice>>,
}

impl SimHandle {
    /// Device address.
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Number of connection attempts made so far.
    pub fn connect_attempts(&self) -> usize {
        self.device.lock().connect_times.len()
    }

    /// When each connection attempt was made.
    pub fn connect_times(&self) -> Vec<Instant> {
        self.device.lock().connect_times.clone()
    }

    /// Number of disconnects.
    pub fn disconnects(&self) -> u32 {
        self.device.lock().disconnects
    }

    /// Whether a link is currently open.
    pub fn is_connected(&self) -> bool {
        self.device.lock().connected
    }

    /// Every command frame the actuator accepted, in order.
    pub fn commands(&self) -> Vec<Frame> {
        self.device.lock().actuator.history().to_vec()
    }

    /// Run `f` against the actuator.
    pub fn with_actuator<R>(&self, f: impl FnOnce(&mut SimulatedActuator) -> R) -> R {
        f(&mut self.device.lock().actuator)
    }

    /// Replace the fault plan.
    pub fn set_faults(&self, faults: FaultPlan) {
        let mut device = self.device.lock();
        device.rng = ChaCha8Rng::seed_from_u64(faults.seed);
        device.faults = faults;
    }
}

/// Connector over a set of simulated actuators.
#[derive(Debug, Default)]
pub struct SimConnector {
    devices: HashMap<DeviceAddress, SimHandle>,
}

impl SimConnector {
    /// An empty connector. Every address is unreachable until added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actuator at `address`, replacing any previous one.
    pub fn add(&mut self, address: impl Into<DeviceAddress>, profile: SimProfile) -> SimHandle {
        let address = address.into();
        let device = SimDevice {
            actuator: SimulatedActuator::new(&profile),
            rng: ChaCha8Rng::seed_from_u64(profile.faults.seed),
            faults: profile.faults,
            connect_times: Vec::new(),
            disconnects: 0,
            connected: false,
            replies_sent: 0,
        };
        let handle = SimHandle {
            address: address.clone(),
            device: Arc::new(Mutex::new(device)),
        };
        self.devices.insert(address, handle.clone());
        handle
    }

    /// Handle for the device at `address`.
    pub fn device(&self, address: &DeviceAddress) -> Option<SimHandle> {
        self.devices.get(address).cloned()
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no devices are registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Connector for SimConnector {
    type Link = SimLink;

    fn connect(&mut self, address: &DeviceAddress) -> LinkResult<SimLink> {
        let handle = self
            .devices
            .get(address)
            .ok_or_else(|| LinkError::Unreachable(address.clone()))?;

        let mut device = handle.device.lock();
        device.connect_times.push(Instant::now());
        let attempt = device.connect_times.len() as u32;

        if device.faults.unreachable || attempt <= device.faults.failed_connects {
            debug!(%address, attempt, "simulated connect failure");
            return Err(LinkError::Unreachable(address.clone()));
        }
        if device.connected {
            return Err(LinkError::Transport(format!("{} already has a connection", address)));
        }

        device.connected = true;
        device.actuator.reset_connection();
        drop(device);

        debug!(%address, attempt, "simulated connect");
        Ok(SimLink::new(handle.clone()))
    }
}

/// Link to one simulated actuator.
#[derive(Debug)]
pub struct SimLink {
    handle: SimHandle,
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    open: bool,
}

impl SimLink {
    fn new(handle: SimHandle) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        SimLink {
            handle,
            tx,
            rx,
            open: true,
        }
    }

    /// Handle to the device behind this link.
    pub fn handle(&self) -> &SimHandle {
        &self.handle
    }

    /// Queue a raw notification as if the actuator had sent it.
    pub fn inject(&self, raw: Vec<u8>) {
        let _ = self.tx.send(raw);
    }

    /// Notifications waiting to be read.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    fn ensure_open(&self) -> LinkResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(LinkError::Disconnected(self.handle.address.clone()))
        }
    }
}

impl RadioLink for SimLink {
    fn address(&self) -> &DeviceAddress {
        &self.handle.address
    }

    fn write(&mut self, frame: &[u8]) -> LinkResult<WriteAck> {
        self.ensure_open()?;
        let mut device = self.handle.device.lock();
        if device.faults.reject_writes {
            return Err(LinkError::WriteRejected(format!(
                "{} refused the write",
                self.handle.address
            )));
        }

        let replies = device.actuator.receive(frame);
        if device.faults.silent {
            trace!(address = %self.handle.address, dropped = replies.len(), "silent device");
        } else {
            for reply in replies {
                if device.next_reply_is_noisy() {
                    let noisy = device.corrupt(&reply);
                    self.tx
                        .send(noisy)
                        .map_err(|e| LinkError::Transport(e.to_string()))?;
                }
                self.tx
                    .send(reply)
                    .map_err(|e| LinkError::Transport(e.to_string()))?;
            }
        }

        Ok(WriteAck {
            bytes_written: frame.len(),
        })
    }

    fn wait_for_notification(&mut self, timeout: Duration) -> LinkResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        match self.rx.recv_timeout(timeout) {
            Ok(raw) => Ok(Some(raw)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(LinkError::Disconnected(self.handle.address.clone()))
            }
        }
    }

    fn disconnect(&mut self) -> LinkResult<()> {
        self.ensure_open()?;
        self.open = false;
        let mut device = self.handle.device.lock();
        device.connected = false;
        device.disconnects += 1;
        debug!(address = %self.handle.address, "simulated disconnect");
        Ok(())
    }
}
