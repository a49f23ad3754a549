//! A scriptable in-memory transport driver.
//!
//! `FakeDriver` implements [`IoDriver`] the way a loopback test plugin
//! would: its URI scheme is `<PREFIX>:<device-id>`, its devices are
//! whatever the test scripted, and every call is appended to a shared
//! [`DriverLog`] for later assertions. Connections echo scripted read
//! data and capture writes.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use wireterm_io::{
    DetectedDevice, DriverConnection, DriverError, DriverInfo, EventPoster, IoDriver, OptionList,
    TransferError,
};

/// Everything a test wants to know about what the driver was asked to do.
#[derive(Debug, Default)]
pub struct DriverLog {
    /// Number of `init` calls.
    pub inits: usize,
    /// Number of `detect` calls.
    pub detects: usize,
    /// Device IDs passed to `allocate`, in order.
    pub allocates: Vec<String>,
    /// Option snapshots passed to `open`, in order.
    pub opens: Vec<OptionList>,
    /// Number of `close` calls across all connections.
    pub closes: usize,
    /// Data captured from `write` calls, concatenated.
    pub written: Vec<u8>,
    /// Option snapshots passed to `change_options`.
    pub option_changes: Vec<OptionList>,
    /// Number of `transmit` calls.
    pub transmits: usize,
}

impl DriverLog {
    /// Total driver calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.inits
            + self.detects
            + self.allocates.len()
            + self.opens.len()
            + self.closes
            + self.option_changes.len()
            + self.transmits
    }
}

/// One scripted device the fake driver will "detect".
#[derive(Debug, Clone)]
pub struct FakeDevice {
    /// Driver-local device ID.
    pub device_id: String,
    /// Display name.
    pub name: String,
    /// Short title.
    pub title: String,
    /// Scripted in-use flag.
    pub in_use: bool,
}

impl FakeDevice {
    /// A device whose name and title equal its ID.
    pub fn named(id: &str) -> Self {
        Self { device_id: id.to_string(), name: id.to_string(), title: id.to_string(), in_use: false }
    }
}

/// Scriptable fake transport driver.
pub struct FakeDriver {
    prefix: String,
    devices: Vec<FakeDevice>,
    block_device: bool,
    fail_init: bool,
    fail_allocate: bool,
    with_change_options: bool,
    with_transmit: bool,
    read_script: VecDeque<u8>,
    log: Arc<Mutex<DriverLog>>,
    /// Poster handed to the most recently allocated connection.
    last_poster: Arc<Mutex<Option<EventPoster>>>,
}

impl FakeDriver {
    /// A driver with the given URI prefix and no devices.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            devices: Vec::new(),
            block_device: false,
            fail_init: false,
            fail_allocate: false,
            with_change_options: false,
            with_transmit: false,
            read_script: VecDeque::new(),
            log: Arc::new(Mutex::new(DriverLog::default())),
            last_poster: Arc::new(Mutex::new(None)),
        }
    }

    /// Script the devices `detect` reports.
    #[must_use]
    pub fn with_devices(mut self, devices: Vec<FakeDevice>) -> Self {
        self.devices = devices;
        self
    }

    /// Report as a block/datagram transport.
    #[must_use]
    pub fn block_device(mut self) -> Self {
        self.block_device = true;
        self
    }

    /// Make `init` fail, so registration removes the driver.
    #[must_use]
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Make `allocate` fail.
    #[must_use]
    pub fn failing_allocate(mut self) -> Self {
        self.fail_allocate = true;
        self
    }

    /// Advertise the change-options capability.
    #[must_use]
    pub fn with_change_options(mut self) -> Self {
        self.with_change_options = true;
        self
    }

    /// Advertise the transmit capability.
    #[must_use]
    pub fn with_transmit(mut self) -> Self {
        self.with_transmit = true;
        self
    }

    /// Bytes every allocated connection will serve to `read`.
    #[must_use]
    pub fn with_read_data(mut self, data: &[u8]) -> Self {
        self.read_script = data.iter().copied().collect();
        self
    }

    /// Shared call log handle; keep a clone before registering.
    pub fn log(&self) -> Arc<Mutex<DriverLog>> {
        Arc::clone(&self.log)
    }

    /// Event poster of the most recently allocated connection, for
    /// posting events from the test as if from a driver thread.
    pub fn poster_cell(&self) -> Arc<Mutex<Option<EventPoster>>> {
        Arc::clone(&self.last_poster)
    }
}

impl IoDriver for FakeDriver {
    fn init(&mut self) -> Result<(), DriverError> {
        self.log.lock().inits += 1;
        if self.fail_init {
            return Err(DriverError::new("scripted init failure"));
        }
        Ok(())
    }

    fn driver_info(&self) -> DriverInfo {
        DriverInfo {
            uri_help: format!("{}:<device>", self.prefix),
            block_device: self.block_device,
        }
    }

    fn detect(&mut self) -> Vec<DetectedDevice> {
        self.log.lock().detects += 1;
        self.devices
            .iter()
            .map(|dev| DetectedDevice {
                device_id: dev.device_id.clone(),
                name: dev.name.clone(),
                title: dev.title.clone(),
                in_use: dev.in_use,
            })
            .collect()
    }

    fn connection_info(&mut self, device_id: &str, _options: &OptionList) -> Option<DetectedDevice> {
        self.devices
            .iter()
            .find(|dev| dev.device_id == device_id)
            .map(|dev| DetectedDevice {
                device_id: dev.device_id.clone(),
                name: dev.name.clone(),
                title: dev.title.clone(),
                in_use: dev.in_use,
            })
    }

    fn allocate(
        &mut self,
        device_id: &str,
        events: EventPoster,
    ) -> Result<Box<dyn DriverConnection>, DriverError> {
        self.log.lock().allocates.push(device_id.to_string());
        if self.fail_allocate {
            return Err(DriverError::new("scripted allocate failure"));
        }
        *self.last_poster.lock() = Some(events);
        Ok(Box::new(FakeConnection {
            log: Arc::clone(&self.log),
            read_data: self.read_script.clone(),
            with_change_options: self.with_change_options,
            with_transmit: self.with_transmit,
            last_error: None,
        }))
    }

    fn uri_to_options(&self, uri: &str, options: &mut OptionList, update: bool) -> Option<String> {
        // Scheme: <PREFIX>:<device-id>, where the device ID doubles as a
        // key=value option when it contains '='.
        let rest = uri
            .get(..self.prefix.len())
            .filter(|head| head.eq_ignore_ascii_case(&self.prefix))
            .and_then(|_| uri[self.prefix.len()..].strip_prefix(':'))?;
        if rest.is_empty() {
            return None;
        }
        if !update {
            options.clear();
        }
        if let Some((key, value)) = rest.split_once('=') {
            options.set(key, value);
        }
        Some(rest.to_string())
    }

    fn options_to_uri(&self, device_id: &str, _options: &OptionList) -> Option<String> {
        Some(format!("{}:{device_id}", self.prefix))
    }
}

struct FakeConnection {
    log: Arc<Mutex<DriverLog>>,
    read_data: VecDeque<u8>,
    with_change_options: bool,
    with_transmit: bool,
    last_error: Option<String>,
}

impl DriverConnection for FakeConnection {
    fn open(&mut self, options: &OptionList) -> Result<(), DriverError> {
        self.log.lock().opens.push(options.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().closes += 1;
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransferError> {
        let mut count = 0;
        while count < buf.len() {
            match self.read_data.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                },
                None => break,
            }
        }
        Ok(count)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransferError> {
        self.log.lock().written.extend_from_slice(data);
        Ok(())
    }

    fn supports_change_options(&self) -> bool {
        self.with_change_options
    }

    fn change_options(&mut self, options: &OptionList) -> Result<(), DriverError> {
        self.log.lock().option_changes.push(options.clone());
        Ok(())
    }

    fn supports_transmit(&self) -> bool {
        self.with_transmit
    }

    fn transmit(&mut self) -> Result<(), TransferError> {
        self.log.lock().transmits += 1;
        Ok(())
    }

    fn last_error_message(&self) -> Option<String> {
        self.last_error.clone()
    }
}
