//! Driver traits for transport plugins.
//!
//! A transport (serial port, TCP client, UDP server, ...) plugs into the
//! subsystem by implementing [`IoDriver`]. The registry never knows what a
//! transport does; it only routes through these traits.
//!
//! Mandatory plugin callbacks are the required trait methods, so a driver
//! that compiles is a driver with a complete function table. Optional
//! callbacks are provided methods paired with a `supports_*` capability
//! query; a driver that leaves them alone advertises
//! capability-not-supported rather than erroring at call time.

use crate::bridge::EventPoster;
use crate::error::{DriverError, TransferError};
use crate::options::OptionList;

/// Static facts a driver reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverInfo {
    /// One-line hint for the connect dialog showing the URI syntax,
    /// e.g. `TCP://host:port`.
    pub uri_help: String,

    /// True when the transport moves datagrams/blocks (UDP) rather than a
    /// byte stream (TCP, serial).
    pub block_device: bool,
}

/// One device a driver can currently see.
///
/// Rebuilt wholesale on every scan; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedDevice {
    /// Driver-local device ID (opaque to the subsystem).
    pub device_id: String,

    /// Display name, e.g. `USB Serial Port (COM3)`.
    pub name: String,

    /// Short title for tab labels, e.g. `COM3`.
    pub title: String,

    /// Whether the device looks like it is already open elsewhere.
    pub in_use: bool,
}

/// Registered-driver facts for UI listings: name plus URI help line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSummary {
    /// Registered driver name.
    pub name: String,

    /// The driver's URI syntax hint.
    pub uri_help: String,
}

/// A transport plugin.
///
/// All methods run on the application thread. Drivers that need worker
/// threads spawn them from [`IoDriver::allocate`]'s connection and post
/// events through the [`EventPoster`] they were given.
pub trait IoDriver: Send {
    /// One-time startup hook, called once after registration.
    ///
    /// # Errors
    ///
    /// A failing driver is removed from the registry entirely and never
    /// appears in discovery or lookup again.
    fn init(&mut self) -> Result<(), DriverError>;

    /// Static driver facts.
    fn driver_info(&self) -> DriverInfo;

    /// Enumerate devices this driver can currently see.
    fn detect(&mut self) -> Vec<DetectedDevice>;

    /// Point info for one device, given its driver-local ID and options.
    ///
    /// Returns `None` when the device cannot be described.
    fn connection_info(&mut self, device_id: &str, options: &OptionList) -> Option<DetectedDevice>;

    /// Allocate the driver-private state for one connection.
    ///
    /// `events` is the connection's channel back into the application; it
    /// may be cloned into worker threads.
    ///
    /// # Errors
    ///
    /// Failure aborts handle creation; the subsystem rolls back anything
    /// it already built.
    fn allocate(
        &mut self,
        device_id: &str,
        events: EventPoster,
    ) -> Result<Box<dyn DriverConnection>, DriverError>;

    /// Parse a URI into a device ID, filling `options` with the settings
    /// encoded in it.
    ///
    /// With `update` false the driver should reset `options` to defaults
    /// first; with `update` true it only overwrites the keys the URI
    /// mentions. Returns `None` when the URI is not valid for this driver.
    fn uri_to_options(&self, uri: &str, options: &mut OptionList, update: bool) -> Option<String>;

    /// Rebuild a URI from a device ID and options.
    ///
    /// Returns `None` when the combination cannot be expressed as a URI.
    fn options_to_uri(&self, device_id: &str, options: &OptionList) -> Option<String>;
}

/// Driver-private state for one live connection.
///
/// Owned exclusively by the handle manager's handle entry; the manager
/// never interprets it beyond calling these methods.
pub trait DriverConnection: Send {
    /// Open the connection with the given options.
    ///
    /// # Errors
    ///
    /// The handle stays closed on failure.
    fn open(&mut self, options: &OptionList) -> Result<(), DriverError>;

    /// Close the connection. Must be idempotent.
    fn close(&mut self);

    /// Non-blocking read into `buf`.
    ///
    /// Returns `Ok(0)` when no bytes are available right now.
    ///
    /// # Errors
    ///
    /// See [`TransferError`] for the retry contract.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransferError>;

    /// Non-blocking write of `data`.
    ///
    /// # Errors
    ///
    /// [`TransferError::Busy`] means try again later; nothing was queued.
    fn write(&mut self, data: &[u8]) -> Result<(), TransferError>;

    /// Whether [`DriverConnection::change_options`] is implemented.
    fn supports_change_options(&self) -> bool {
        false
    }

    /// Re-apply options to a live connection.
    ///
    /// Only called when `supports_change_options` returns true.
    ///
    /// # Errors
    ///
    /// The stored option snapshot is updated regardless; the error is
    /// surfaced to the caller.
    fn change_options(&mut self, _options: &OptionList) -> Result<(), DriverError> {
        Ok(())
    }

    /// Whether [`DriverConnection::transmit`] is implemented.
    fn supports_transmit(&self) -> bool {
        false
    }

    /// Flush queued outgoing data (block devices assemble a packet from
    /// buffered writes and send it here).
    ///
    /// # Errors
    ///
    /// Same mapping as [`DriverConnection::write`].
    fn transmit(&mut self) -> Result<(), TransferError> {
        Ok(())
    }

    /// Human-readable detail for the most recent failure, if the driver
    /// keeps one.
    fn last_error_message(&self) -> Option<String> {
        None
    }
}
