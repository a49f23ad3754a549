//! Driver registry and connection discovery.
//!
//! The registry owns every transport driver for the life of the process.
//! Registration validates the driver's name and URI prefix up front and is
//! all-or-nothing; a driver whose `init` fails is removed entirely and
//! never appears in discovery or lookup again.
//!
//! Discovery asks every driver to enumerate devices, caches the results
//! per driver, and merges them into one natural-order-sorted descriptor
//! list tagged with globally unique IDs.

use crate::driver::{DetectedDevice, DriverInfo, DriverSummary, IoDriver};
use crate::error::{HandleError, RegistryError};
use crate::options::OptionList;
use crate::{natsort, unique_id};

/// Devices kept per driver on one scan; anything beyond this is discarded.
pub const MAX_DEVICES_PER_SCAN: usize = 100;

/// One registered driver plus its cached detection results.
pub(crate) struct RegisteredDriver {
    pub name: String,
    /// Stored uppercased; matched case-insensitively.
    pub uri_prefix: String,
    pub info: DriverInfo,
    pub driver: Box<dyn IoDriver>,
    pub devices: Vec<DetectedDevice>,
}

/// A detected connection decorated for the user-facing list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Combined `driver-escaped-device-id`, unique across all drivers.
    pub unique_id: String,

    /// Display name.
    pub name: String,

    /// Short title.
    pub title: String,

    /// Whether the device looked busy at scan time.
    pub in_use: bool,

    /// Datagram/block transport rather than a byte stream.
    pub block_device: bool,
}

/// Owns the registered drivers and their detection caches.
///
/// Single-threaded by design: every method runs on the application thread
/// (see the crate docs for the threading model).
#[derive(Default)]
pub struct DriverRegistry {
    drivers: Vec<RegisteredDriver>,
    scanned: bool,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport driver under `name` with URI prefix
    /// `uri_prefix`.
    ///
    /// `name` must be non-empty `[A-Za-z0-9]+`; `uri_prefix` must be
    /// non-empty `[A-Za-z]+` and is stored uppercased. Nothing is added on
    /// failure.
    ///
    /// # Errors
    ///
    /// [`RegistryError`] describing the rejected field.
    pub fn register(
        &mut self,
        name: &str,
        uri_prefix: &str,
        driver: Box<dyn IoDriver>,
    ) -> Result<(), RegistryError> {
        if name.is_empty() || uri_prefix.is_empty() {
            tracing::warn!(name, uri_prefix, "rejected driver registration: empty field");
            return Err(RegistryError::Empty);
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            tracing::warn!(name, "rejected driver registration: bad name");
            return Err(RegistryError::InvalidDriverName { name: name.to_string() });
        }
        if !uri_prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            tracing::warn!(uri_prefix, "rejected driver registration: bad URI prefix");
            return Err(RegistryError::InvalidUriPrefix { prefix: uri_prefix.to_string() });
        }

        let info = driver.driver_info();
        self.drivers.push(RegisteredDriver {
            name: name.to_string(),
            uri_prefix: uri_prefix.to_ascii_uppercase(),
            info,
            driver,
            devices: Vec::new(),
        });
        Ok(())
    }

    /// Run every driver's `init` hook, removing the ones that fail.
    ///
    /// Call once at startup after all drivers have registered.
    pub fn init_drivers(&mut self) {
        self.drivers.retain_mut(|drv| match drv.driver.init() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(driver = %drv.name, %err, "driver init failed, removing");
                false
            },
        });
    }

    /// Number of registered drivers.
    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    /// Name and URI help line for every registered driver.
    pub fn driver_summaries(&self) -> Vec<DriverSummary> {
        self.drivers
            .iter()
            .map(|drv| DriverSummary { name: drv.name.clone(), uri_help: drv.info.uri_help.clone() })
            .collect()
    }

    /// Ask every driver to re-enumerate its devices, replacing the cached
    /// lists.
    ///
    /// At most [`MAX_DEVICES_PER_SCAN`] devices are kept per driver. Any
    /// descriptor list from a previous [`DriverRegistry::connections`]
    /// call is stale after this runs.
    pub fn scan(&mut self) {
        for drv in &mut self.drivers {
            let mut detected = drv.driver.detect();
            if detected.len() > MAX_DEVICES_PER_SCAN {
                tracing::debug!(
                    driver = %drv.name,
                    found = detected.len(),
                    "scan found more devices than the cap, discarding the rest"
                );
                detected.truncate(MAX_DEVICES_PER_SCAN);
            }
            drv.devices = detected;
        }
        self.scanned = true;
    }

    /// Merged, natural-order-sorted list of every detectable connection.
    ///
    /// Runs a scan first if none has ever run. Sorting is by display name,
    /// case-insensitive and numeric-aware (`Port2` before `Port10`); ties
    /// keep discovery order.
    pub fn connections(&mut self) -> Vec<ConnectionDescriptor> {
        if !self.scanned {
            self.scan();
        }

        let mut list: Vec<ConnectionDescriptor> = Vec::new();
        for drv in &self.drivers {
            for dev in &drv.devices {
                list.push(ConnectionDescriptor {
                    unique_id: unique_id::combine(&drv.name, &dev.device_id),
                    name: dev.name.clone(),
                    title: dev.title.clone(),
                    in_use: dev.in_use,
                    block_device: drv.info.block_device,
                });
            }
        }
        // Stable sort keeps discovery order for equal names
        list.sort_by(|a, b| natsort::compare(&a.name, &b.name));
        list
    }

    /// Find a cached connection by its combined unique ID.
    ///
    /// Returns `None` for unknown drivers or device IDs that no scan has
    /// seen.
    pub fn find_connection(&self, combined_id: &str) -> Option<ConnectionDescriptor> {
        let (driver_name, device_id) = unique_id::split(combined_id).ok()?;
        let drv = self.drivers.iter().find(|d| d.name == driver_name)?;
        let dev = drv.devices.iter().find(|d| d.device_id == device_id)?;
        Some(ConnectionDescriptor {
            unique_id: combined_id.to_string(),
            name: dev.name.clone(),
            title: dev.title.clone(),
            in_use: dev.in_use,
            block_device: drv.info.block_device,
        })
    }

    /// Point lookup of connection info through the driver itself, for
    /// devices that may not be in the scan cache.
    pub fn connection_info(
        &mut self,
        combined_id: &str,
        options: &OptionList,
    ) -> Option<ConnectionDescriptor> {
        let (driver_name, device_id) = unique_id::split(combined_id).ok()?;
        let drv = self.drivers.iter_mut().find(|d| d.name == driver_name)?;
        let dev = drv.driver.connection_info(&device_id, options)?;
        Some(ConnectionDescriptor {
            unique_id: combined_id.to_string(),
            name: dev.name,
            title: dev.title,
            in_use: dev.in_use,
            block_device: drv.info.block_device,
        })
    }

    /// Derive the combined unique ID for a URI.
    ///
    /// The URI's leading letters select the driver (case-insensitively);
    /// the driver parses the rest.
    ///
    /// # Errors
    ///
    /// [`HandleError::UnknownUriPrefix`] or
    /// [`HandleError::UriConversion`].
    pub fn unique_id_from_uri(&self, uri: &str) -> Result<String, HandleError> {
        let (combined_id, _options) = self.parse_uri(uri)?;
        Ok(combined_id)
    }

    /// Resolve a URI to `(combined unique ID, parsed options)`.
    pub(crate) fn parse_uri(&self, uri: &str) -> Result<(String, OptionList), HandleError> {
        let drv = self.driver_by_prefix(uri)?;
        let mut options = OptionList::new();
        let device_id = drv
            .driver
            .uri_to_options(uri, &mut options, false)
            .ok_or_else(|| HandleError::UriConversion(uri.to_string()))?;
        Ok((unique_id::combine(&drv.name, &device_id), options))
    }

    /// Rebuild a URI from a combined unique ID and options.
    ///
    /// # Errors
    ///
    /// Lookup errors for the driver, or [`HandleError::UriConversion`]
    /// when the driver cannot express the combination.
    pub fn uri_from_unique_id(
        &self,
        combined_id: &str,
        options: &OptionList,
    ) -> Result<String, HandleError> {
        let (driver_name, device_id) = unique_id::split(combined_id)?;
        let drv = self.driver_by_name(&driver_name)?;
        drv.driver
            .options_to_uri(&device_id, options)
            .ok_or_else(|| HandleError::UriConversion(combined_id.to_string()))
    }

    /// Overwrite the option keys a URI mentions, leaving the rest alone.
    ///
    /// # Errors
    ///
    /// Same as [`DriverRegistry::unique_id_from_uri`].
    pub fn update_options_from_uri(
        &self,
        uri: &str,
        options: &mut OptionList,
    ) -> Result<(), HandleError> {
        let drv = self.driver_by_prefix(uri)?;
        drv.driver
            .uri_to_options(uri, options, true)
            .ok_or_else(|| HandleError::UriConversion(uri.to_string()))?;
        Ok(())
    }

    pub(crate) fn driver_by_name(&self, name: &str) -> Result<&RegisteredDriver, HandleError> {
        self.drivers
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| HandleError::UnknownDriver(name.to_string()))
    }

    pub(crate) fn driver_by_name_mut(
        &mut self,
        name: &str,
    ) -> Result<&mut RegisteredDriver, HandleError> {
        self.drivers
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| HandleError::UnknownDriver(name.to_string()))
    }

    pub(crate) fn driver_by_prefix(&self, uri: &str) -> Result<&RegisteredDriver, HandleError> {
        let prefix = unique_id::uri_prefix(uri);
        self.drivers
            .iter()
            .find(|d| d.uri_prefix == prefix)
            .ok_or(HandleError::UnknownUriPrefix(prefix))
    }
}
