//! Radio-link abstraction for AM43 actuators.
//!
//! The control layer never scans, pairs or discovers GATT characteristics.
//! It receives a [`Connector`] that turns a [`DeviceAddress`] into a connected
//! [`RadioLink`], and only ever writes frames to that link and waits for
//! notifications from it.
//!
//! A successful [`RadioLink::write`] means the *transport* accepted the bytes.
//! Whether the actuator accepted the *command* is reported separately, by an
//! acknowledgement notification.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Opaque wireless address of one actuator (e.g. a BLE MAC string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Wrap an address string.
    pub fn new(address: impl Into<String>) -> Self {
        DeviceAddress(address.into())
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(value: &str) -> Self {
        DeviceAddress::new(value)
    }
}

impl From<String> for DeviceAddress {
    fn from(value: String) -> Self {
        DeviceAddress(value)
    }
}

/// Transport-level confirmation that a write was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    /// Number of bytes the transport took.
    pub bytes_written: usize,
}

/// Errors reported by the radio link.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The device could not be reached.
    #[error("device {0} unreachable")]
    Unreachable(DeviceAddress),

    /// The transport refused a write.
    #[error("write rejected: {0}")]
    WriteRejected(String),

    /// The link dropped.
    #[error("link to {0} disconnected")]
    Disconnected(DeviceAddress),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type alias for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// One connected actuator.
pub trait RadioLink {
    /// Address this link is connected to.
    fn address(&self) -> &DeviceAddress;

    /// Write one frame to the command characteristic.
    fn write(&mut self, frame: &[u8]) -> LinkResult<WriteAck>;

    /// Block until the next notification arrives or `timeout` elapses.
    ///
    /// Returns `Ok(None)` on timeout.
    fn wait_for_notification(&mut self, timeout: Duration) -> LinkResult<Option<Vec<u8>>>;

    /// Close the connection.
    fn disconnect(&mut self) -> LinkResult<()>;
}

/// Opens links to actuators.
pub trait Connector {
    /// Link type produced by this connector.
    type Link: RadioLink;

    /// Connect to the actuator at `address`.
    fn connect(&mut self, address: &DeviceAddress) -> LinkResult<Self::Link>;
}

impl<C: Connector + ?Sized> Connector for &mut C {
    type Link = C::Link;

    fn connect(&mut self, address: &DeviceAddress) -> LinkResult<Self::Link> {
        (**self).connect(address)
    }
}

/// Exclusive owner of a connected link.
///
/// The link is disconnected when the guard is closed or dropped, whichever
/// comes first, so a faulted session still releases its connection.
pub struct LinkGuard<L: RadioLink> {
    link: L,
    closed: bool,
}

impl<L: RadioLink> LinkGuard<L> {
    /// Take ownership of a connected link.
    pub fn new(link: L) -> Self {
        LinkGuard {
            link,
            closed: false,
        }
    }

    /// Address of the guarded link.
    pub fn address(&self) -> &DeviceAddress {
        self.link.address()
    }

    /// Mutable access to the link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Whether the link has already been released.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Disconnect now. Calling this twice is a no-op.
    pub fn close(&mut self) -> LinkResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!(address = %self.link.address(), "disconnecting");
        self.link.disconnect()
    }
}

impl<L: RadioLink> Drop for LinkGuard<L> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                warn!(address = %self.link.address(), error = %e, "disconnect on drop failed");
            }
        }
    }
}

impl<L: RadioLink> std::fmt::Debug for LinkGuard<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkGuard")
            .field("address", self.link.address())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingLink {
        address: DeviceAddress,
        disconnects: Rc<Cell<u32>>,
    }

    impl RadioLink for CountingLink {
        fn address(&self) -> &DeviceAddress {
            &self.address
        }

        fn write(&mut self, frame: &[u8]) -> LinkResult<WriteAck> {
            Ok(WriteAck {
                bytes_written: frame.len(),
            })
        }

        fn wait_for_notification(&mut self, _timeout: Duration) -> LinkResult<Option<Vec<u8>>> {
            Ok(None)
        }

        fn disconnect(&mut self) -> LinkResult<()> {
            self.disconnects.set(self.disconnects.get() + 1);
            Ok(())
        }
    }

    fn counting_link() -> (CountingLink, Rc<Cell<u32>>) {
        let disconnects = Rc::new(Cell::new(0));
        let link = CountingLink {
            address: DeviceAddress::new("AA:BB:CC:DD:EE:FF"),
            disconnects: disconnects.clone(),
        };
        (link, disconnects)
    }

    #[test]
    fn test_guard_disconnects_on_drop() {
        let (link, disconnects) = counting_link();
        {
            let _guard = LinkGuard::new(link);
        }
        assert_eq!(disconnects.get(), 1);
    }

    #[test]
    fn test_guard_close_is_idempotent() {
        let (link, disconnects) = counting_link();
        let mut guard = LinkGuard::new(link);
        guard.close().unwrap();
        guard.close().unwrap();
        assert!(guard.is_closed());
        drop(guard);
        assert_eq!(disconnects.get(), 1);
    }

    #[test]
    fn test_address_display() {
        let address = DeviceAddress::from("02:4E:F0:E3:8A:2B");
        assert_eq!(address.to_string(), "02:4E:F0:E3:8A:2B");
        assert_eq!(address.as_str(), "02:4E:F0:E3:8A:2B");
    }
}
